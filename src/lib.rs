//! # Staging Release Library
//!
//! This library provisions a personal staging copy of the release
//! automation: a buildbot master, a release runner, and the user's forks of
//! the release repositories patched to point at each other. It is driven by
//! the `staging-release` command-line tool but every step is usable on its
//! own.
//!
//! ## Quick Example
//!
//! ```
//! use staging_release::config::Config;
//! use staging_release::patch::patch_map;
//!
//! let config: Config = "[common]\nusername = alice\ntracking_bug = 12345\n"
//!     .parse()
//!     .unwrap();
//! let username = config.get("common", "username").unwrap();
//! let bug = config.get("common", "tracking_bug").unwrap();
//!
//! let map = patch_map(&["tools"], &username, &bug);
//! assert_eq!(map["tools"].production, "build/tools");
//! assert_eq!(map["tools"].user, "users/alice_mozilla.com/tools-12345");
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`, `settings`)**: one INI file, read once, then
//!   shared as `&Config`. Each component parses its own section into typed
//!   settings before it does any work.
//! - **Repositories (`repository`, `vcs`)**: logical names resolved to URLs
//!   per clone source and driven through `hg` or `git`.
//! - **Environments (`venv`)**: Python virtual environments built with
//!   `virtualenv` and filled with `pip`.
//! - **Provisioners (`master`, `release_runner`)**: ordered installation
//!   steps; the master records its progress so an interrupted install can be
//!   resumed.
//! - **Patch workflow (`patch`)**: rewrites production repository paths in
//!   the user's forks and pushes the result.
//! - **Downloads (`download`, `locales`)**: plain HTTP(S) fetches.
//!
//! Every component fails with its own error type from [`error`].

pub mod config;
pub mod defaults;
pub mod download;
pub mod error;
pub mod locales;
pub mod master;
pub mod patch;
pub mod process;
pub mod release_runner;
pub mod repository;
pub mod retry;
pub mod settings;
pub mod template;
pub mod vcs;
pub mod venv;

#[cfg(test)]
mod substitution_proptest;
