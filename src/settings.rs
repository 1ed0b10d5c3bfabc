//! # Typed Component Settings
//!
//! Every provisioning component reads its options from one section of the
//! shared [`Config`]. Instead of looking options up by name deep inside the
//! provisioning flow, each component parses its section once, up front, into
//! one of the structs below. A missing required option therefore fails before
//! anything touches the filesystem or the network.
//!
//! The `Config` is still handed to the components alongside their settings:
//! the master template needs arbitrary `@TOKEN@` lookups and the release
//! runner serializes the whole configuration verbatim.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, COMMON_SECTION};
use crate::defaults;
use crate::error::ConfigError;
use crate::vcs::VcsKind;

/// Section holding the release runner options.
pub const RELEASE_RUNNER_SECTION: &str = "release-runner";
/// Section holding the master options.
pub const MASTER_SECTION: &str = "master";
/// Section holding the virtualenv tool options.
pub const VIRTUALENV_SECTION: &str = "virtualenv";
/// Section listing the files patched for each release type.
pub const STAGING_FILES_SECTION: &str = "staging_files";

fn required(config: &Config, section: &str, option: &str) -> Result<String, ConfigError> {
    config.get(section, option)
}

fn required_path(config: &Config, section: &str, option: &str) -> Result<PathBuf, ConfigError> {
    Ok(defaults::expand_home(&config.get(section, option)?))
}

fn optional_list(config: &Config, section: &str, option: &str) -> Result<Vec<String>, ConfigError> {
    Ok(config
        .get_opt(section, option)?
        .map(|value| crate::config::split_list(&value))
        .unwrap_or_default())
}

fn parse_number<T: std::str::FromStr>(
    config: &Config,
    section: &str,
    option: &str,
    default: T,
) -> Result<T, ConfigError> {
    match config.get_opt(section, option)? {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            section: section.to_string(),
            option: option.to_string(),
            message: format!("'{}' is not a number", value),
        }),
    }
}

/// Options from the `[common]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonSettings {
    pub username: String,
    pub tracking_bug: Option<String>,
    pub version: Option<String>,
    pub staging_release: Vec<String>,
    pub vcs: VcsKind,
}

impl CommonSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let username = config
            .get_opt(COMMON_SECTION, "username")?
            .filter(|name| !name.trim().is_empty())
            .or_else(defaults::current_username)
            .ok_or_else(|| ConfigError::MissingOption {
                section: COMMON_SECTION.to_string(),
                option: "username".to_string(),
            })?;
        let vcs = match config.get_opt(COMMON_SECTION, "vcs")? {
            None => VcsKind::default(),
            Some(value) => value.parse().map_err(|message| ConfigError::Invalid {
                section: COMMON_SECTION.to_string(),
                option: "vcs".to_string(),
                message,
            })?,
        };
        Ok(Self {
            username,
            tracking_bug: config.get_opt(COMMON_SECTION, "tracking_bug")?,
            version: config.get_opt(COMMON_SECTION, "version")?,
            staging_release: optional_list(config, COMMON_SECTION, "staging_release")?,
            vcs,
        })
    }

    /// The tracking bug, required by the patch workflow.
    pub fn require_tracking_bug(&self) -> Result<&str, ConfigError> {
        self.tracking_bug
            .as_deref()
            .ok_or_else(|| ConfigError::MissingOption {
                section: COMMON_SECTION.to_string(),
                option: "tracking_bug".to_string(),
            })
    }
}

/// Options from the `[virtualenv]` section, all optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualenvSettings {
    pub command: String,
    pub python: Option<String>,
}

impl Default for VirtualenvSettings {
    fn default() -> Self {
        Self {
            command: defaults::VIRTUALENV.to_string(),
            python: None,
        }
    }
}

impl VirtualenvSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            command: config
                .get_opt(VIRTUALENV_SECTION, "command")?
                .unwrap_or_else(|| defaults::VIRTUALENV.to_string()),
            python: config.get_opt(VIRTUALENV_SECTION, "python")?,
        })
    }
}

/// Options from the `[master]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterSettings {
    pub basedir: PathBuf,
    pub repositories: Vec<String>,
    pub clone_from: String,
    pub branch: String,
    pub virtualenv_extra_args: Vec<String>,
    pub virtualenv_requirements: Vec<String>,
    pub json_template: PathBuf,
    pub dst_json: PathBuf,
    /// Program and arguments creating the master, run inside the configs checkout.
    pub create_master: Vec<String>,
    pub buildbot_install: Vec<String>,
    pub setup_py: Option<PathBuf>,
    pub site_packages: PathBuf,
    pub buildbotcustom_dir: PathBuf,
    pub pth_file: PathBuf,
    pub tools_python: String,
    pub buildbot_configs_dir: PathBuf,
    pub make: String,
}

impl MasterSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let section = MASTER_SECTION;
        let basedir = required_path(config, section, "basedir")?;
        let buildbot_configs_dir = match config.get_opt(section, "buildbot_configs_dir")? {
            Some(dir) => defaults::expand_home(&dir),
            None => basedir.join("buildbot-configs"),
        };
        let create_master = config.get_list(section, "create_master")?;
        if create_master.is_empty() {
            return Err(ConfigError::Invalid {
                section: section.to_string(),
                option: "create_master".to_string(),
                message: "no command given".to_string(),
            });
        }
        Ok(Self {
            repositories: config.get_list(section, "repositories")?,
            clone_from: config
                .get_opt(section, "clone_from")?
                .unwrap_or_else(|| defaults::CLONE_FROM.to_string()),
            branch: config
                .get_opt(section, "branch")?
                .unwrap_or_else(|| defaults::BRANCH.to_string()),
            virtualenv_extra_args: optional_list(config, section, "virtualenv_extra_args")?,
            virtualenv_requirements: config.get_list(section, "virtualenv_requirements")?,
            json_template: required_path(config, section, "json_template")?,
            dst_json: required_path(config, section, "dst_json")?,
            create_master,
            buildbot_install: optional_list(config, section, "buildbot_install")?,
            setup_py: config
                .get_opt(section, "setup_py")?
                .map(|path| defaults::expand_home(&path)),
            site_packages: required_path(config, section, "site_packages")?,
            buildbotcustom_dir: required_path(config, section, "buildbotcustom_dir")?,
            pth_file: required_path(config, section, "pth_file")?,
            tools_python: required(config, section, "tools_python")?,
            buildbot_configs_dir,
            make: config
                .get_opt(section, "make")?
                .unwrap_or_else(|| defaults::MAKE.to_string()),
            basedir,
        })
    }
}

/// Options from the `[release-runner]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRunnerSettings {
    pub basedir: PathBuf,
    pub repositories: Vec<String>,
    pub requirements: Vec<String>,
    /// Entry point handed to the environment's interpreter.
    pub startup: String,
    pub startup_path: PathBuf,
    pub dst_ini_file: PathBuf,
    pub clone_from: String,
    pub branch: String,
}

impl ReleaseRunnerSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let section = RELEASE_RUNNER_SECTION;
        Ok(Self {
            basedir: required_path(config, section, "basedir")?,
            repositories: config.get_list(section, "repositories")?,
            requirements: config.get_list(section, "requirements")?,
            startup: required(config, section, "startup")?,
            startup_path: required_path(config, section, "startup_path")?,
            dst_ini_file: required_path(config, section, "dst_ini_file")?,
            clone_from: config
                .get_opt(section, "clone_from")?
                .unwrap_or_else(|| defaults::CLONE_FROM.to_string()),
            branch: config
                .get_opt(section, "branch")?
                .unwrap_or_else(|| defaults::BRANCH.to_string()),
        })
    }
}

/// Pacing of the remote availability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            attempts: defaults::POLL_ATTEMPTS,
            interval: Duration::from_secs(defaults::POLL_INTERVAL_SECS),
        }
    }
}

impl PollSettings {
    pub fn from_config(config: &Config, section: &str) -> Result<Self, ConfigError> {
        let attempts = parse_number(config, section, "poll_attempts", defaults::POLL_ATTEMPTS)?;
        let interval = parse_number(
            config,
            section,
            "poll_interval",
            defaults::POLL_INTERVAL_SECS,
        )?;
        Ok(Self {
            attempts: attempts.max(1),
            interval: Duration::from_secs(interval),
        })
    }
}

/// Options from a `[patch-<repository>]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSettings {
    pub section: String,
    /// Repository names fed to [`crate::patch::patch_map`].
    pub replace: Vec<String>,
    pub commit_message: String,
    pub tag: Option<String>,
    pub poll: PollSettings,
    pub src_production_masters_json: Option<String>,
    pub dst_production_masters_json: Option<String>,
}

impl PatchSettings {
    pub fn from_config(config: &Config, section: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            section: section.to_string(),
            replace: optional_list(config, section, "replace")?,
            commit_message: required(config, section, "commit_message")?,
            tag: config.get_opt(section, "tag")?,
            poll: PollSettings::from_config(config, section)?,
            src_production_masters_json: config.get_opt(section, "src_production_masters_json")?,
            dst_production_masters_json: config.get_opt(section, "dst_production_masters_json")?,
        })
    }

    /// Source URL and clone-relative destination of the production masters template.
    pub fn production_masters(&self) -> Result<(&str, &str), ConfigError> {
        let missing = |option: &str| ConfigError::MissingOption {
            section: self.section.clone(),
            option: option.to_string(),
        };
        let src = self
            .src_production_masters_json
            .as_deref()
            .ok_or_else(|| missing("src_production_masters_json"))?;
        let dst = self
            .dst_production_masters_json
            .as_deref()
            .ok_or_else(|| missing("dst_production_masters_json"))?;
        Ok((src, dst))
    }
}

/// Staging file patterns for a set of release types, in declaration order.
///
/// The union covers every release type plus the fixed `common_files` and
/// `l10n` groups.
pub fn staging_files(config: &Config, release_types: &[String]) -> Result<Vec<String>, ConfigError> {
    let mut patterns = Vec::new();
    let groups = release_types
        .iter()
        .map(String::as_str)
        .chain(["common_files", "l10n"]);
    for group in groups {
        for pattern in config.get_list(STAGING_FILES_SECTION, group)? {
            if !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }
    }
    Ok(patterns)
}
