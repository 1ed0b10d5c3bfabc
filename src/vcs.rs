//! # Version Control Backends
//!
//! Repositories are driven through the system `hg` or `git` command, which
//! automatically picks up SSH keys, credential helpers and whatever
//! authentication is configured for the user. The [`VersionControl`] trait is
//! the seam between the provisioning flow and the tool, so tests can swap in
//! a recording implementation instead of touching a real remote.
//!
//! Mercurial is the default backend. Git is selected with `vcs = git` in the
//! `[common]` section.

use std::fmt;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::str::FromStr;
use std::sync::Arc;

use log::debug;

use crate::error::{CommandError, RepositoryError};
use crate::process;

/// Operations the provisioning flow needs from a version-control tool.
pub trait VersionControl: Send + Sync {
    /// Clone `branch` of the repository at `url` into `target_dir`.
    fn clone_branch(&self, url: &str, branch: &str, target_dir: &Path) -> Result<(), CommandError>;

    /// Stage every working tree change and commit it with `message`.
    fn commit(&self, repo_dir: &Path, message: &str) -> Result<(), CommandError>;

    /// Create a tag on the working copy parent.
    fn tag(&self, repo_dir: &Path, name: &str) -> Result<(), CommandError>;

    /// Push committed changesets to `url`.
    fn push(&self, repo_dir: &Path, url: &str) -> Result<(), CommandError>;

    /// Whether `branch` of the remote at `url` can be queried right now.
    fn is_available(&self, url: &str, branch: &str) -> bool;
}

/// Which version-control tool to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VcsKind {
    #[default]
    Mercurial,
    Git,
}

impl FromStr for VcsKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hg" | "mercurial" => Ok(VcsKind::Mercurial),
            "git" => Ok(VcsKind::Git),
            other => Err(format!("unknown version control '{}' (expected hg or git)", other)),
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsKind::Mercurial => f.write_str("hg"),
            VcsKind::Git => f.write_str("git"),
        }
    }
}

impl VcsKind {
    /// Build the backend for this tool.
    pub fn backend(self) -> Arc<dyn VersionControl> {
        match self {
            VcsKind::Mercurial => Arc::new(Mercurial),
            VcsKind::Git => Arc::new(Git),
        }
    }
}

/// Prepare `target_dir` for a fresh clone.
///
/// The tools refuse to clone into a non-empty directory, so a leftover
/// destination is removed; its parent is created when missing.
pub fn prepare_clone_target(target_dir: &Path) -> Result<(), RepositoryError> {
    if target_dir.exists() {
        debug!("removing stale clone target {}", target_dir.display());
        fs::remove_dir_all(target_dir)?;
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// The system `hg` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mercurial;

impl VersionControl for Mercurial {
    fn clone_branch(&self, url: &str, branch: &str, target_dir: &Path) -> Result<(), CommandError> {
        process::run(
            Command::new("hg")
                .args(["clone", "--branch", branch, url])
                .arg(target_dir),
        )
    }

    fn commit(&self, repo_dir: &Path, message: &str) -> Result<(), CommandError> {
        process::run(
            Command::new("hg")
                .current_dir(repo_dir)
                .args(["commit", "--addremove", "--message", message]),
        )
    }

    fn tag(&self, repo_dir: &Path, name: &str) -> Result<(), CommandError> {
        process::run(
            Command::new("hg")
                .current_dir(repo_dir)
                .args(["tag", "--force", name]),
        )
    }

    fn push(&self, repo_dir: &Path, url: &str) -> Result<(), CommandError> {
        // hg push exits 1 when there is nothing to push
        match process::run(Command::new("hg").current_dir(repo_dir).args(["push", url])) {
            Err(CommandError::Failed {
                status: Some(1), ..
            }) => {
                debug!("hg push: no changes to push to {}", url);
                Ok(())
            }
            other => other,
        }
    }

    fn is_available(&self, url: &str, branch: &str) -> bool {
        process::run(Command::new("hg").args(["identify", "--rev", branch, url])).is_ok()
    }
}

/// The system `git` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git;

impl VersionControl for Git {
    fn clone_branch(&self, url: &str, branch: &str, target_dir: &Path) -> Result<(), CommandError> {
        process::run(
            Command::new("git")
                .args(["clone", "--branch", branch, url])
                .arg(target_dir),
        )
    }

    fn commit(&self, repo_dir: &Path, message: &str) -> Result<(), CommandError> {
        process::run(Command::new("git").current_dir(repo_dir).args(["add", "-A"]))?;
        process::run(
            Command::new("git")
                .current_dir(repo_dir)
                .args(["commit", "--message", message]),
        )
    }

    fn tag(&self, repo_dir: &Path, name: &str) -> Result<(), CommandError> {
        process::run(
            Command::new("git")
                .current_dir(repo_dir)
                .args(["tag", "--force", name]),
        )
    }

    fn push(&self, repo_dir: &Path, url: &str) -> Result<(), CommandError> {
        process::run(
            Command::new("git")
                .current_dir(repo_dir)
                .args(["push", "--tags", url, "HEAD"]),
        )
    }

    fn is_available(&self, url: &str, branch: &str) -> bool {
        process::run(Command::new("git").args(["ls-remote", "--exit-code", url, branch])).is_ok()
    }
}
