//! # Staging Release CLI
//!
//! This is the binary entry point for the `staging-release` command-line
//! tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging from `--log-level` / `RUST_LOG`.
//! - Executing the appropriate command based on the parsed arguments.
//!
//! The provisioning logic is defined in the `lib.rs` library crate, so the
//! binary stays a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
