//! # Master Command Implementation
//!
//! This module implements the `master` subcommand, which manages a
//! standalone buildbot master:
//!
//! - `install` (default): provision into a base directory that does not
//!   exist yet.
//! - `resume`: continue an interrupted install from its recorded state.
//! - `start`, `stop`, `checkconfig`: run the matching Makefile target in the
//!   base directory.

use std::fmt;

use anyhow::Result;
use clap::{Args, ValueEnum};
use log::error;

use staging_release::master::Master;
use staging_release::settings::CommonSettings;

use super::{load_config, ConfigArgs};

/// What to do with the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MasterAction {
    Install,
    Resume,
    Start,
    Stop,
    Checkconfig,
}

impl fmt::Display for MasterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            MasterAction::Install | MasterAction::Resume => "install",
            MasterAction::Start => "start",
            MasterAction::Stop => "stop",
            MasterAction::Checkconfig => "check",
        };
        f.write_str(verb)
    }
}

/// Install or control a standalone buildbot master
#[derive(Args, Debug)]
pub struct MasterArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Action to perform
    #[arg(long, value_enum, default_value_t = MasterAction::Install)]
    pub action: MasterAction,
}

/// Execute the `master` command.
pub fn execute(args: MasterArgs) -> Result<()> {
    let config = load_config(&args.config, None)?;
    let vcs = CommonSettings::from_config(&config)?.vcs.backend();

    let result = Master::new(&config, vcs).and_then(|master| match args.action {
        MasterAction::Install => master.install(),
        MasterAction::Resume => master.resume(),
        MasterAction::Start => master.start(),
        MasterAction::Stop => master.stop(),
        MasterAction::Checkconfig => master.checkconfig(),
    });
    if let Err(err) = result {
        error!("unable to {} buildbot master: {}", args.action, err);
    }
    Ok(())
}
