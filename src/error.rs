//! # Error Handling
//!
//! This module defines every error kind used by `staging-release`. Each
//! provisioning component fails with exactly one error type, built with
//! `thiserror`, and lower level failures are wrapped once at the boundary of
//! the component that can add context:
//!
//! - **`ConfigError`**: missing sections/options, unreadable files, bad
//!   interpolation.
//! - **`CommandError`**: a subprocess could not be spawned or exited with a
//!   non-zero status.
//! - **`DownloadError`**: HTTP status or transport failure while fetching a URL.
//! - **`NoLocalesError`**: the shipped locales list could not be retrieved.
//! - **`RepositoryError`**: any version-control command failure.
//! - **`VirtualenvError`**: environment creation or dependency install failure.
//! - **`TemplateError`**: `@TOKEN@` substitution failure.
//! - **`MasterError`**, **`ReleaseRunnerError`**, **`PatchError`**: the
//!   provisioner level errors the entry points catch and log.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or querying the INI configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read or parsed.
    #[error("Cannot load configuration {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    /// A section that a component requires is not present.
    #[error("Missing configuration section [{section}]")]
    MissingSection { section: String },

    /// An option that a component requires is not present.
    #[error("Missing configuration option [{section}] {option}")]
    MissingOption { section: String, option: String },

    /// A `%(name)s` reference could not be resolved.
    #[error("Interpolation error in [{section}] {option}: {message}")]
    Interpolation {
        section: String,
        option: String,
        message: String,
    },

    /// An option is present but its value is not acceptable.
    #[error("Invalid value for [{section}] {option}: {message}")]
    Invalid {
        section: String,
        option: String,
        message: String,
    },

    /// Writing the configuration back to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A subprocess failed to start or exited unsuccessfully.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The program could not be started at all.
    #[error("Cannot run {command}: {message}")]
    Spawn { command: String, message: String },

    /// The program ran and reported failure.
    #[error("Command failed: {command} {}", failure_detail(status, stderr))]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}

/// Exit status, then the tool's diagnostic when it printed one.
fn failure_detail(status: &Option<i32>, stderr: &str) -> String {
    let status = match status {
        Some(code) => format!("(exit code {})", code),
        None => "(terminated by signal)".to_string(),
    };
    match stderr.trim_end() {
        "" => status,
        diagnostic => format!("{} - {}", status, diagnostic),
    }
}

/// Errors raised by the downloader.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The server answered with a non-2xx status.
    #[error("Cannot download {url}: HTTP error {status}")]
    Status { url: String, status: u16 },

    /// The request never produced a response (resolution, connection, TLS).
    #[error("Cannot download {url}: {message}")]
    Transport { url: String, message: String },

    /// The response body could not be written to the destination.
    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The shipped locales list could not be retrieved.
#[derive(Error, Debug)]
pub enum NoLocalesError {
    #[error("No locales available: {0}")]
    Download(#[from] DownloadError),

    #[error("Cannot read locales list: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by repository operations.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The clone source URL could not be resolved from configuration.
    #[error("Cannot resolve repository {name}: {source}")]
    Resolve {
        name: String,
        #[source]
        source: ConfigError,
    },

    /// A version-control command failed; carries the tool diagnostic.
    #[error("Repository {operation} failed for {target}: {source}")]
    Command {
        operation: String,
        target: String,
        #[source]
        source: CommandError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building a virtual environment.
#[derive(Error, Debug)]
pub enum VirtualenvError {
    #[error("Cannot create virtualenv in {}: {source}", root.display())]
    Create {
        root: PathBuf,
        #[source]
        source: CommandError,
    },

    #[error("Cannot install {requirements}: {source}")]
    Install {
        requirements: String,
        #[source]
        source: CommandError,
    },

    #[error("Cannot run {}: {source}", script.display())]
    SetupPy {
        script: PathBuf,
        #[source]
        source: CommandError,
    },
}

/// Errors raised while generating a file from an `@TOKEN@` template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Cannot resolve template token @{token}@: {source}")]
    Token {
        token: String,
        #[source]
        source: ConfigError,
    },

    #[error("Template I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the master provisioner.
#[derive(Error, Debug)]
pub enum MasterError {
    /// The base directory exists and is not a resumable installation.
    #[error("Cannot create: {} ({message})", path.display())]
    AlreadyExists { path: PathBuf, message: String },

    /// The install state record is missing or unreadable.
    #[error("Invalid install state in {}: {message}", path.display())]
    State { path: PathBuf, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Virtualenv(#[from] VirtualenvError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the release runner provisioner.
#[derive(Error, Debug)]
pub enum ReleaseRunnerError {
    #[error("cannot create virtualenv: {0}")]
    Virtualenv(#[from] VirtualenvError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by the repository patch workflow.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("unable to download production master template: {0}")]
    Download(#[from] DownloadError),

    /// The remote never became clonable within the polling budget.
    #[error("{url} (branch {branch}) still unavailable after {attempts} attempts")]
    RemoteUnavailable {
        url: String,
        branch: String,
        attempts: u32,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A staging file pattern is not a valid glob.
    #[error("Invalid staging file pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
