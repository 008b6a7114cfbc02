//! # Stagehand CLI
//!
//! This is the binary entry point for the `stagehand` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Installing the SIGINT handler and running the engine.
//! - Translating the run outcome into a process exit code.
//!
//! The core application logic is defined in the `lib.rs` library crate,
//! ensuring that the binary is a thin wrapper around the reusable library
//! functionality.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let exit_code = cli.execute()?;
    std::process::exit(exit_code);
}
