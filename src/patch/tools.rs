//! Patch for the user's tools fork: regenerate `production-masters.json`.

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info};

use super::{Fix, Patch};
use crate::config::Config;
use crate::download::download;
use crate::error::PatchError;
use crate::settings::MASTER_SECTION;
use crate::template::generate_master_json;
use crate::vcs::VersionControl;

/// Options section of this variant.
pub const SECTION: &str = "patch-tools";

const REPOSITORY: &str = "tools";

// tools has no production branch
const BRANCH: &str = "default";

pub struct ToolsPatch<'a> {
    patch: Patch<'a>,
}

impl<'a> ToolsPatch<'a> {
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

impl Fix for ToolsPatch<'_> {
    fn name(&self) -> &str {
        self.patch.name()
    }

    fn fix(&self) -> Result<(), PatchError> {
        info!("running {}", self.name());
        let (src_url, dst) = self.patch.settings().production_masters()?;

        let checkout = self.patch.clone(REPOSITORY, BRANCH)?;
        let pm_json = checkout.path().join(dst);
        info!("production masters: {}", pm_json.display());

        // the template needs detokenizing, so it is fetched next to its destination
        let mut temp_name = OsString::from(pm_json.as_os_str());
        temp_name.push("temp");
        let temp_pm_json = PathBuf::from(temp_name);
        if let Err(err) = download(src_url, &temp_pm_json) {
            error!("unable to download production master template");
            return Err(err.into());
        }

        generate_master_json(
            self.patch.config(),
            MASTER_SECTION,
            &temp_pm_json,
            &pm_json,
        )?;
        fs::remove_file(&temp_pm_json)?;

        self.patch.commit_changes(&checkout)?;
        self.patch.push_changes(checkout)
    }
}
