//! Persisted install state of a master.
//!
//! The record lives at `<basedir>/.install-state` and names the last
//! transition that completed:
//!
//! ```json
//! {"state":"environment-ready"}
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults::INSTALL_STATE_FILE;
use crate::error::MasterError;

/// Install progress, in the order transitions happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallState {
    Unconfigured,
    DirectoriesCreated,
    EnvironmentReady,
    DependenciesInstalled,
    BuildbotInstalled,
    Configured,
}

impl InstallState {
    pub const ALL: [InstallState; 6] = [
        InstallState::Unconfigured,
        InstallState::DirectoriesCreated,
        InstallState::EnvironmentReady,
        InstallState::DependenciesInstalled,
        InstallState::BuildbotInstalled,
        InstallState::Configured,
    ];

    /// The state reached by the next transition, if any.
    pub fn next(self) -> Option<InstallState> {
        Self::ALL.iter().copied().find(|state| *state > self)
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallState::Unconfigured => "unconfigured",
            InstallState::DirectoriesCreated => "directories-created",
            InstallState::EnvironmentReady => "environment-ready",
            InstallState::DependenciesInstalled => "dependencies-installed",
            InstallState::BuildbotInstalled => "buildbot-installed",
            InstallState::Configured => "configured",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    state: InstallState,
}

/// Location of the record for a base directory.
pub fn record_path(basedir: &Path) -> PathBuf {
    basedir.join(INSTALL_STATE_FILE)
}

/// Read the recorded state; `Ok(None)` when no record exists.
pub fn read(basedir: &Path) -> Result<Option<InstallState>, MasterError> {
    let path = record_path(basedir);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let record: Record = serde_json::from_str(&content).map_err(|e| MasterError::State {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(Some(record.state))
}

/// Record that `state` has been reached.
pub fn write(basedir: &Path, state: InstallState) -> Result<(), MasterError> {
    let path = record_path(basedir);
    let content = serde_json::to_string(&Record { state }).map_err(|e| MasterError::State {
        path: path.clone(),
        message: e.to_string(),
    })?;
    fs::write(&path, content)?;
    Ok(())
}
