//! # Repos Command Implementation
//!
//! This module implements the `repos` subcommand, which patches the user's
//! buildbot-configs and tools forks so they reference the user's other
//! forks. The buildbot-configs patch runs first; the first failure is logged
//! and ends the run.

use anyhow::Result;
use clap::Args;
use log::{error, info};

use staging_release::error::PatchError;
use staging_release::patch::{BuildbotConfigsPatch, Fix, ToolsPatch};
use staging_release::settings::CommonSettings;

use super::{load_config, ConfigArgs, ReleaseArgs};

/// Patch the user repositories for a staging release
#[derive(Args, Debug)]
pub struct ReposArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub release: ReleaseArgs,
}

/// Execute the `repos` command.
pub fn execute(args: ReposArgs) -> Result<()> {
    let config = load_config(&args.config, Some(&args.release))?;
    let vcs = CommonSettings::from_config(&config)?.vcs.backend();
    let release_types = args.release.release_types();

    let run = || -> Result<(), PatchError> {
        let patches: Vec<Box<dyn Fix + '_>> = vec![
            Box::new(BuildbotConfigsPatch::new(&config, &release_types, vcs.clone())?),
            Box::new(ToolsPatch::new(&config, &release_types, vcs.clone())?),
        ];
        for patch in &patches {
            patch.fix()?;
            info!("{} done", patch.name());
        }
        Ok(())
    };
    if let Err(err) = run() {
        error!("unable to patch user repositories: {}", err);
    }
    Ok(())
}
