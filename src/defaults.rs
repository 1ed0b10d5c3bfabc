//! Default values for staging-release configuration.
//!
//! This module provides centralized default values used when an optional
//! option is absent from the configuration file, ensuring every component
//! falls back to the same thing.

use std::path::PathBuf;

/// Locale that is always shipped and therefore never listed.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Clone source used when a section does not name one.
pub const CLONE_FROM: &str = "canonical";

/// Branch cloned when a section does not name one.
pub const BRANCH: &str = "default";

/// Build tool driving the master's Makefile.
pub const MAKE: &str = "make";

/// Program used to create virtual environments.
pub const VIRTUALENV: &str = "virtualenv";

/// Attempts made before a freshly created remote is declared unavailable.
pub const POLL_ATTEMPTS: u32 = 6;

/// Base delay between availability probes, doubled after every attempt.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Name of the install state record kept in the master base directory.
pub const INSTALL_STATE_FILE: &str = ".install-state";

/// Expand a leading `~/` to the user's home directory.
///
/// Paths without the prefix, or a system without a home directory, are
/// returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Returns the login name of the current user from the environment.
pub fn current_username() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
}
