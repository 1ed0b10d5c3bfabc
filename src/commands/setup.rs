//! # Setup Command Implementation
//!
//! This module implements the `setup` subcommand: the full staging setup. It
//! installs a buildbot master and then a release runner from one
//! configuration file.
//!
//! The settings of both components are parsed before the master install
//! starts. A master failure is logged and the release runner
//! is not attempted. A release runner failure is logged too. Neither changes
//! the exit status.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use log::{error, info};

use staging_release::master::Master;
use staging_release::release_runner::ReleaseRunner;
use staging_release::settings::CommonSettings;
use staging_release::vcs::VersionControl;

use super::{load_config, ConfigArgs, ReleaseArgs};

/// Install a staging master and release runner
#[derive(Args, Debug)]
pub struct SetupArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Start the release runner after a successful install (blocks)
    #[arg(long)]
    pub start_runner: bool,
}

/// Execute the `setup` command.
pub fn execute(args: SetupArgs) -> Result<()> {
    let config = load_config(&args.config, Some(&args.release))?;
    let vcs: Arc<dyn VersionControl> = CommonSettings::from_config(&config)?.vcs.backend();
    info!(
        "staging release {} for bug {}",
        args.release.version, args.release.bug
    );

    let master = match Master::new(&config, Arc::clone(&vcs)) {
        Ok(master) => master,
        Err(err) => {
            error!("unable to install buildbot master: {}", err);
            return Ok(());
        }
    };
    let runner = match ReleaseRunner::new(&config, vcs) {
        Ok(runner) => runner,
        Err(err) => {
            error!("unable to install release runner: {}", err);
            return Ok(());
        }
    };

    if let Err(err) = master.install() {
        error!("unable to install buildbot master: {}", err);
        return Ok(());
    }
    if let Err(err) = runner.install() {
        error!("unable to install release runner: {}", err);
        return Ok(());
    }

    if args.start_runner {
        if let Err(err) = runner.start() {
            error!("unable to start release runner: {}", err);
        }
    }
    Ok(())
}
