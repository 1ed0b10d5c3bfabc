//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `staging-release` command-line tool. Each subcommand is an independent
//! driver that loads the configuration, constructs the provisioning
//! components it needs and runs them in order.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic.
//!
//! Unreadable configuration and malformed arguments are returned as errors
//! and end the process with a non-zero status. Provisioning failures are
//! logged and the command still exits successfully.
//!
//! The options shared by every command live here.

pub mod master;
pub mod repos;
pub mod setup;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::debug;

use staging_release::config::{self, Config, COMMON_SECTION};
use staging_release::defaults;

/// Configuration file and overrides accepted by every command.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Configuration file
    #[arg(short = 'c', long = "cfg", value_name = "FILE")]
    pub cfg: PathBuf,

    /// Username: if not specified, the current user is used
    #[arg(short, long, value_name = "NAME")]
    pub username: Option<String>,

    /// Override a configuration value (repeatable)
    #[arg(short = 'o', long = "option", value_name = "SECTION.OPTION=VALUE")]
    pub overrides: Vec<String>,
}

/// Release identification shared by `setup` and `repos`.
#[derive(Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// Bug tracking id
    #[arg(short, long, value_name = "BUG")]
    pub bug: String,

    /// Version being staged
    #[arg(short = 'v', long, value_name = "VERSION")]
    pub version: String,

    /// Staging release comma separated values (e.g: firefox,fennec)
    #[arg(short, long, value_name = "TYPES")]
    pub release: String,
}

impl ReleaseArgs {
    /// Record the release in the `[common]` section.
    pub fn apply(&self, config: &mut Config) {
        config.set(COMMON_SECTION, "tracking_bug", &self.bug);
        config.set(COMMON_SECTION, "version", &self.version);
        config.set(COMMON_SECTION, "staging_release", &self.release);
    }

    pub fn release_types(&self) -> Vec<String> {
        config::split_list(&self.release)
    }
}

impl ConfigArgs {
    /// Read the configuration file and layer the command line on top.
    ///
    /// The username falls back to the current user so `%(username)s`
    /// references always resolve.
    pub fn load(&self) -> Result<Config> {
        let mut config = config::from_file(&self.cfg)
            .with_context(|| format!("Failed to load config from {}", self.cfg.display()))?;
        for spec in &self.overrides {
            config
                .set_override(spec)
                .with_context(|| format!("Invalid --option '{}'", spec))?;
        }
        match &self.username {
            Some(username) => config.set(COMMON_SECTION, "username", username),
            None if !config.has_option(COMMON_SECTION, "username") => {
                if let Some(username) = defaults::current_username() {
                    config.set(COMMON_SECTION, "username", &username);
                }
            }
            None => {}
        }
        Ok(config)
    }
}

/// Load the configuration, apply `release` when given, and log the result.
pub fn load_config(args: &ConfigArgs, release: Option<&ReleaseArgs>) -> Result<Config> {
    let mut config = args.load()?;
    if let Some(release) = release {
        release.apply(&mut config);
    }
    debug!("configuration:\n{}", config);
    Ok(config)
}
