//! Patch for the user's buildbot-configs fork.

use std::sync::Arc;

use log::info;

use super::{Fix, Patch};
use crate::config::Config;
use crate::error::PatchError;
use crate::vcs::VersionControl;

/// Options section of this variant.
pub const SECTION: &str = "patch-buildbot-configs";

const REPOSITORY: &str = "buildbot-configs";

/// Release automation reads `production` and commits to `default`; both
/// need the staging paths.
const BRANCHES: [&str; 2] = ["default", "production"];

pub struct BuildbotConfigsPatch<'a> {
    patch: Patch<'a>,
}

impl<'a> BuildbotConfigsPatch<'a> {
    pub fn new(
        config: &'a Config,
        release_types: &[String],
        vcs: Arc<dyn VersionControl>,
    ) -> Result<Self, PatchError> {
        Ok(Self {
            patch: Patch::new(config, SECTION, release_types, vcs)?,
        })
    }
}

impl Fix for BuildbotConfigsPatch<'_> {
    fn name(&self) -> &str {
        self.patch.name()
    }

    fn fix(&self) -> Result<(), PatchError> {
        info!("running {}", self.name());
        for branch in BRANCHES {
            let checkout = self.patch.clone(REPOSITORY, branch)?;
            self.patch.update_configs(&checkout)?;
            self.patch.commit_changes(&checkout)?;
            self.patch.push_changes(checkout)?;
        }
        Ok(())
    }
}
