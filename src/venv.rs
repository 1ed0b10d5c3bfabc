//! # Virtual Environment Builder
//!
//! Creates an isolated Python environment with the configured `virtualenv`
//! program and installs dependencies into it with the environment's own
//! `pip`. The environment layout is fixed (`bin/activate`, `bin/python`,
//! `bin/pip` under the root), so every path is known before the environment
//! exists. That lets a resumed installation reuse an environment created by
//! an earlier run.
//!
//! A failed creation or install is not rolled back.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;

use crate::error::VirtualenvError;
use crate::process;
use crate::settings::VirtualenvSettings;

/// Dependencies to install: one requirement specifier or a list of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirements {
    Single(String),
    List(Vec<String>),
}

impl Requirements {
    fn as_args(&self) -> Vec<&str> {
        match self {
            Requirements::Single(requirement) => vec![requirement.as_str()],
            Requirements::List(requirements) => requirements.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for Requirements {
    fn from(requirement: &str) -> Self {
        Requirements::Single(requirement.to_string())
    }
}

impl From<String> for Requirements {
    fn from(requirement: String) -> Self {
        Requirements::Single(requirement)
    }
}

impl From<Vec<String>> for Requirements {
    fn from(requirements: Vec<String>) -> Self {
        Requirements::List(requirements)
    }
}

impl From<&[String]> for Requirements {
    fn from(requirements: &[String]) -> Self {
        Requirements::List(requirements.to_vec())
    }
}

/// A virtual environment rooted at a base directory.
#[derive(Debug, Clone)]
pub struct Virtualenv {
    settings: VirtualenvSettings,
    root: PathBuf,
}

impl Virtualenv {
    pub fn new(settings: VirtualenvSettings, root: &Path) -> Self {
        Self {
            settings,
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Script sourced to activate the environment in a shell.
    pub fn activate_path(&self) -> PathBuf {
        self.root.join("bin").join("activate")
    }

    /// The environment's interpreter.
    pub fn python_path(&self) -> PathBuf {
        self.root.join("bin").join("python")
    }

    pub fn pip_path(&self) -> PathBuf {
        self.root.join("bin").join("pip")
    }

    /// Create the environment, passing `extra_args` to the virtualenv program.
    pub fn create(&self, extra_args: &[String]) -> Result<(), VirtualenvError> {
        info!("creating virtualenv in {}", self.root.display());
        let mut cmd = Command::new(&self.settings.command);
        if let Some(python) = &self.settings.python {
            cmd.args(["-p", python]);
        }
        cmd.args(extra_args).arg(&self.root);
        process::run(&mut cmd).map_err(|source| VirtualenvError::Create {
            root: self.root.clone(),
            source,
        })
    }

    /// Install one requirement or a list of them with the environment's pip.
    pub fn install_dependencies(
        &self,
        requirements: impl Into<Requirements>,
    ) -> Result<(), VirtualenvError> {
        let requirements = requirements.into();
        let args = requirements.as_args();
        if args.is_empty() {
            return Ok(());
        }
        info!("installing {}", args.join(" "));
        process::run(Command::new(self.pip_path()).arg("install").args(&args)).map_err(
            |source| VirtualenvError::Install {
                requirements: args.join(" "),
                source,
            },
        )
    }

    /// Run `script` (a `setup.py`) with the environment's interpreter.
    ///
    /// The script runs from its own directory.
    pub fn setup_py(&self, script: &Path, args: &[String]) -> Result<(), VirtualenvError> {
        info!("running {} {}", script.display(), args.join(" "));
        let mut cmd = Command::new(self.python_path());
        cmd.arg(script).args(args);
        if let Some(dir) = script.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        process::run(&mut cmd).map_err(|source| VirtualenvError::SetupPy {
            script: script.to_path_buf(),
            source,
        })
    }
}
