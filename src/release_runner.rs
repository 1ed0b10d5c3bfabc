//! # Release Runner Provisioner
//!
//! Installs the release runner described by the `[release-runner]` section:
//! its repositories are cloned into the base directory, a virtual
//! environment is built there, and an executable startup script is written.
//! The live configuration is then saved as the runner's own ini file, so the
//! runner reads exactly the values the provisioning run used.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use log::{debug, error, info};

use crate::config::Config;
use crate::error::{ReleaseRunnerError, VirtualenvError};
use crate::process;
use crate::repository::Repository;
use crate::settings::{ReleaseRunnerSettings, VirtualenvSettings};
use crate::vcs::VersionControl;
use crate::venv::Virtualenv;

/// Contents of the startup script.
pub fn startup_script(basedir: &Path, activate: &Path, python: &Path, startup: &str) -> String {
    format!(
        "#!/bin/bash\n\ncd \"{}\"\nsource {}\n{} {}\n",
        basedir.display(),
        activate.display(),
        python.display(),
        startup
    )
}

pub struct ReleaseRunner<'a> {
    config: &'a Config,
    settings: ReleaseRunnerSettings,
    venv: Virtualenv,
    vcs: Arc<dyn VersionControl>,
}

impl<'a> ReleaseRunner<'a> {
    pub fn new(
        config: &'a Config,
        vcs: Arc<dyn VersionControl>,
    ) -> Result<Self, ReleaseRunnerError> {
        let settings = ReleaseRunnerSettings::from_config(config)?;
        let venv = Virtualenv::new(VirtualenvSettings::from_config(config)?, &settings.basedir);
        Ok(Self {
            config,
            settings,
            venv,
            vcs,
        })
    }

    pub fn settings(&self) -> &ReleaseRunnerSettings {
        &self.settings
    }

    /// Clone, build the environment, write the startup script and ini file.
    pub fn install(&self) -> Result<(), ReleaseRunnerError> {
        info!("installing release runner");
        self.clone_repositories()?;
        self.create_virtualenv()?;
        self.create_startup_file()?;
        self.create_ini_file()
    }

    fn clone_repositories(&self) -> Result<(), ReleaseRunnerError> {
        for name in &self.settings.repositories {
            let repo = Repository::new(self.config, name, Arc::clone(&self.vcs));
            repo.clone_locally(
                &self.settings.basedir.join(name),
                &self.settings.branch,
                &self.settings.clone_from,
            )?;
        }
        Ok(())
    }

    /// Build the environment and install `requirements` into it.
    pub fn create_virtualenv(&self) -> Result<(), ReleaseRunnerError> {
        let build = || -> Result<(), VirtualenvError> {
            self.venv.create(&[])?;
            match self.settings.requirements.as_slice() {
                [single] => self.venv.install_dependencies(single.as_str()),
                requirements => self.venv.install_dependencies(requirements),
            }
        };
        build().map_err(|err| {
            let err = ReleaseRunnerError::Virtualenv(err);
            error!("{}", err);
            err
        })
    }

    fn create_startup_file(&self) -> Result<(), ReleaseRunnerError> {
        let path = &self.settings.startup_path;
        info!("writing release runner startup file");
        let script = startup_script(
            &self.settings.basedir,
            &self.venv.activate_path(),
            &self.venv.python_path(),
            &self.settings.startup,
        );
        fs::write(path, &script)?;
        debug!("{}", script);
        make_executable(path)?;
        Ok(())
    }

    /// Save the live configuration as the runner's ini file.
    pub fn create_ini_file(&self) -> Result<(), ReleaseRunnerError> {
        self.config.write_to(&self.settings.dst_ini_file)?;
        Ok(())
    }

    /// Run the startup script; blocks until the runner exits.
    pub fn start(&self) -> Result<(), ReleaseRunnerError> {
        info!("starting release runner");
        process::status(&mut Command::new(&self.settings.startup_path))?;
        Ok(())
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o100);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
