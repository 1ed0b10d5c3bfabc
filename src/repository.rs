//! # Repository References
//!
//! A repository is known to the rest of the application by a logical name,
//! e.g. `buildbot-configs`. The name is also a configuration section listing
//! one URL per clone source:
//!
//! ```ini
//! [buildbot-configs]
//! canonical = https://hg.mozilla.org/build/buildbot-configs
//! user = https://hg.mozilla.org/users/%(username)s_mozilla.com/buildbot-configs-%(tracking_bug)s
//! ```
//!
//! Resolution of (name, clone source) to a URL is a pure configuration
//! lookup, repeated every time it is needed. Cloning yields a [`LocalClone`];
//! committing, tagging and pushing are only possible on that value, so a
//! failed clone never leaves a handle that could be pushed from.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::config::Config;
use crate::error::{ConfigError, RepositoryError};
use crate::vcs::{self, VersionControl};

/// Resolve the URL of `name` for the `clone_from` source.
pub fn resolve_url(config: &Config, name: &str, clone_from: &str) -> Result<String, ConfigError> {
    config.get(name, clone_from)
}

/// A logical repository name bound to the configuration and a VCS backend.
pub struct Repository<'a> {
    config: &'a Config,
    name: String,
    vcs: Arc<dyn VersionControl>,
}

impl<'a> Repository<'a> {
    pub fn new(config: &'a Config, name: &str, vcs: Arc<dyn VersionControl>) -> Self {
        Self {
            config,
            name: name.to_string(),
            vcs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The URL this repository is cloned from for `clone_from`.
    pub fn resolve(&self, clone_from: &str) -> Result<String, RepositoryError> {
        resolve_url(self.config, &self.name, clone_from).map_err(|source| {
            RepositoryError::Resolve {
                name: self.name.clone(),
                source,
            }
        })
    }

    /// Whether `branch` on the `clone_from` remote can be cloned right now.
    pub fn is_available(&self, branch: &str, clone_from: &str) -> Result<bool, RepositoryError> {
        let url = self.resolve(clone_from)?;
        Ok(self.vcs.is_available(&url, branch))
    }

    /// Clone `branch` from the `clone_from` remote into `destination`.
    ///
    /// An existing `destination` is replaced.
    pub fn clone_locally(
        &self,
        destination: &Path,
        branch: &str,
        clone_from: &str,
    ) -> Result<LocalClone, RepositoryError> {
        let url = self.resolve(clone_from)?;
        info!("cloning {} ({}) to {}", self.name, url, destination.display());
        vcs::prepare_clone_target(destination)?;
        self.vcs
            .clone_branch(&url, branch, destination)
            .map_err(|source| RepositoryError::Command {
                operation: "clone".to_string(),
                target: url.clone(),
                source,
            })?;
        Ok(LocalClone {
            name: self.name.clone(),
            path: destination.to_path_buf(),
            remote: url,
            branch: branch.to_string(),
            vcs: Arc::clone(&self.vcs),
        })
    }
}

/// A checked-out working copy of a [`Repository`].
pub struct LocalClone {
    name: String,
    path: PathBuf,
    remote: String,
    branch: String,
    vcs: Arc<dyn VersionControl>,
}

impl LocalClone {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// URL the clone came from, and where [`LocalClone::push`] sends changes.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn failed(&self, operation: &str, source: crate::error::CommandError) -> RepositoryError {
        RepositoryError::Command {
            operation: operation.to_string(),
            target: self.path.display().to_string(),
            source,
        }
    }

    /// Stage and commit every working tree change.
    pub fn commit(&self, message: &str) -> Result<(), RepositoryError> {
        debug!("committing {} on {}: {}", self.name, self.branch, message);
        self.vcs
            .commit(&self.path, message)
            .map_err(|source| self.failed("commit", source))
    }

    pub fn tag(&self, name: &str) -> Result<(), RepositoryError> {
        debug!("tagging {} as {}", self.name, name);
        self.vcs
            .tag(&self.path, name)
            .map_err(|source| self.failed("tag", source))
    }

    /// Push committed changesets back to [`LocalClone::remote`].
    pub fn push(&self) -> Result<(), RepositoryError> {
        info!("pushing {} to {}", self.name, self.remote);
        self.vcs
            .push(&self.path, &self.remote)
            .map_err(|source| self.failed("push", source))
    }
}
