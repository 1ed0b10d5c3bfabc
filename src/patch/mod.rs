//! # Repository Patch Workflow
//!
//! A staging environment runs from the user's forks of the release
//! repositories, so configuration files inside those forks must point at
//! other user forks instead of production. A patch run:
//!
//! 1. waits until the user's fork answers on the requested branch,
//! 2. clones it into a scratch directory,
//! 3. rewrites production repository paths in the staging files
//!    (see [`patch_map`] and [`patch_file`]),
//! 4. commits (optionally tags) and pushes,
//! 5. removes the scratch directory.
//!
//! The two variants, [`BuildbotConfigsPatch`] and [`ToolsPatch`], implement
//! [`Fix`] and differ only in which files they touch.

mod buildbot_configs;
mod name_map;
mod tools;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use tempfile::TempDir;

pub use buildbot_configs::BuildbotConfigsPatch;
pub use name_map::{patch_map, RepoPaths, USER_DOMAIN};
pub use tools::ToolsPatch;

use crate::config::Config;
use crate::error::PatchError;
use crate::repository::{LocalClone, Repository};
use crate::retry;
use crate::settings::{self, CommonSettings, PatchSettings};
use crate::vcs::VersionControl;

/// Clone source of the repositories being patched.
pub const CLONE_FROM: &str = "user";

/// Lines containing this marker reference raw served content and are never
/// rewritten.
pub const RAW_FILE_MARKER: &str = "raw-file";

/// A patch variant.
pub trait Fix {
    /// Section holding the variant's options, e.g. `patch-tools`.
    fn name(&self) -> &str;

    /// Clone, patch, commit and push.
    fn fix(&self) -> Result<(), PatchError>;
}

/// Replace every `src` with `dst` in `path`, skipping `raw-file` lines.
///
/// Returns `true` when the file changed.
pub fn patch_file(path: &Path, src: &str, dst: &str) -> Result<bool, PatchError> {
    debug!("patching: {}", path.display());
    let content = fs::read_to_string(path)?;
    let mut changed = false;
    let mut out = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        if line.contains(src) && !line.contains(RAW_FILE_MARKER) {
            debug!("{} => {}: {}", src, dst, line.trim_end());
            out.push_str(&line.replace(src, dst));
            changed = true;
        } else {
            out.push_str(line);
        }
    }
    if changed {
        debug!("writing changes to: {}", path.display());
        fs::write(path, out)?;
    }
    Ok(changed)
}

/// A scratch clone; the directory is removed when the value is dropped.
pub struct Checkout {
    dir: TempDir,
    clone: LocalClone,
}

impl Checkout {
    pub fn path(&self) -> &Path {
        self.clone.path()
    }

    pub fn local(&self) -> &LocalClone {
        &self.clone
    }

    /// Delete the scratch directory now; failures are only logged.
    pub fn cleanup(self) {
        let dir = self.dir.path().to_path_buf();
        debug!("deleting temp dir: {}", dir.display());
        if let Err(err) = self.dir.close() {
            debug!("failed to delete temporary directory {}: {}", dir.display(), err);
        }
    }
}

/// Steps shared by the patch variants.
pub struct Patch<'a> {
    config: &'a Config,
    settings: PatchSettings,
    username: String,
    tracking_bug: String,
    release_types: Vec<String>,
    vcs: Arc<dyn VersionControl>,
}

impl<'a> Patch<'a> {
    pub fn new(
        config: &'a Config,
        section: &str,
        release_types: &[String],
        vcs: Arc<dyn VersionControl>,
    ) -> Result<Self, PatchError> {
        let common = CommonSettings::from_config(config)?;
        let tracking_bug = common.require_tracking_bug()?.to_string();
        Ok(Self {
            config,
            settings: PatchSettings::from_config(config, section)?,
            username: common.username,
            tracking_bug,
            release_types: release_types.to_vec(),
            vcs,
        })
    }

    pub fn name(&self) -> &str {
        &self.settings.section
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn settings(&self) -> &PatchSettings {
        &self.settings
    }

    fn repository(&self, name: &str) -> Repository<'a> {
        Repository::new(self.config, name, Arc::clone(&self.vcs))
    }

    /// Poll the user's fork of `repository` until `branch` answers.
    pub fn wait_for_remote(&self, repository: &str, branch: &str) -> Result<(), PatchError> {
        let repo = self.repository(repository);
        let url = repo.resolve(CLONE_FROM)?;
        let what = format!("{} ({})", url, branch);
        match retry::poll_until(self.settings.poll, &what, || {
            matches!(repo.is_available(branch, CLONE_FROM), Ok(true))
        }) {
            Some(_) => Ok(()),
            None => Err(PatchError::RemoteUnavailable {
                url,
                branch: branch.to_string(),
                attempts: self.settings.poll.attempts,
            }),
        }
    }

    /// Clone `branch` of the user's fork of `repository` into a fresh
    /// scratch directory.
    pub fn clone(&self, repository: &str, branch: &str) -> Result<Checkout, PatchError> {
        self.wait_for_remote(repository, branch)?;
        let dir = TempDir::new()?;
        debug!("created temp dir: {}", dir.path().display());
        info!("cloning: {} ({})", repository, branch);
        let clone =
            self.repository(repository)
                .clone_locally(&dir.path().join(repository), branch, CLONE_FROM)?;
        Ok(Checkout { dir, clone })
    }

    /// Existing files in the checkout named by the staging file patterns.
    pub fn files_to_update(&self, checkout: &Checkout) -> Result<BTreeSet<PathBuf>, PatchError> {
        let root = glob::Pattern::escape(&checkout.path().to_string_lossy());
        let mut files = BTreeSet::new();
        for pattern in settings::staging_files(self.config, &self.release_types)? {
            let pattern = format!("{}/{}", root, pattern.trim_start_matches('/'));
            for path in glob::glob(&pattern)?.filter_map(Result::ok) {
                if path.is_file() {
                    files.insert(path);
                }
            }
        }
        debug!("files to be patched: {:?}", files);
        Ok(files)
    }

    /// Point every staging file at the user's repositories.
    pub fn update_configs(&self, checkout: &Checkout) -> Result<(), PatchError> {
        let files = self.files_to_update(checkout)?;
        let map = patch_map(&self.settings.replace, &self.username, &self.tracking_bug);
        for paths in map.values() {
            for file in &files {
                patch_file(file, &paths.production, &paths.user)?;
            }
        }
        Ok(())
    }

    pub fn commit_changes(&self, checkout: &Checkout) -> Result<(), PatchError> {
        info!("committing local changes");
        checkout.local().commit(&self.settings.commit_message)?;
        if let Some(tag) = &self.settings.tag {
            checkout.local().tag(tag)?;
        }
        Ok(())
    }

    /// Push and delete the scratch directory.
    pub fn push_changes(&self, checkout: Checkout) -> Result<(), PatchError> {
        info!("pushing changes to remote");
        checkout.local().push()?;
        checkout.cleanup();
        Ok(())
    }
}
