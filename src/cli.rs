//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::commands;

/// Staging Release - Provision a personal staging release environment
#[derive(Parser, Debug)]
#[command(name = "staging-release")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize log output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a buildbot master and a release runner (full staging setup)
    Setup(commands::setup::SetupArgs),

    /// Install or control a standalone buildbot master
    Master(commands::master::MasterArgs),

    /// Patch the user repositories for a staging release
    Repos(commands::repos::ReposArgs),
}

impl Cli {
    fn init_logging(&self) {
        let env = Env::default()
            .default_filter_or(self.log_level.as_str())
            .default_write_style_or(self.color.as_str());
        // a logger may already be installed when embedded
        let _ = env_logger::Builder::from_env(env).try_init();
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();

        match self.command {
            Commands::Setup(args) => commands::setup::execute(args),
            Commands::Master(args) => commands::master::execute(args),
            Commands::Repos(args) => commands::repos::execute(args),
        }
    }
}
