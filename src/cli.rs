//! CLI argument parsing and dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::commands;

/// Run configured tasks against staged git files, with backup and revert
#[derive(Parser, Debug)]
#[command(name = "stagehand")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Allow an empty result when tasks revert all staged changes
    #[arg(long)]
    pub allow_empty: bool,

    /// Number of tasks to run concurrently, or "false" to run serially
    #[arg(short = 'p', long, value_name = "N|false", default_value = "true")]
    pub concurrent: String,

    /// Path to the configuration file, or - to read from stdin
    #[arg(short, long, value_name = "PATH", env = "STAGEHAND_CONFIG")]
    pub config: Option<String>,

    /// Working directory to run in (defaults to the current directory)
    #[arg(long, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    /// Maximum serialized command-line length before chunking
    #[arg(long, value_name = "BYTES")]
    pub max_arg_length: Option<usize>,

    /// Pass repository-relative file paths to tasks instead of absolute
    #[arg(short, long)]
    pub relative: bool,

    /// Skip task parsing and run commands through a shell
    #[arg(
        short = 'x',
        long,
        value_name = "SHELL",
        num_args = 0..=1,
        default_missing_value = "/bin/sh"
    )]
    pub shell: Option<String>,

    /// Do not back up the working tree or revert changes on failure
    #[arg(long = "no-stash", action = clap::ArgAction::SetTrue)]
    pub no_stash: bool,

    /// Stop dispatching new task invocations after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Suppress stagehand's own output except failures
    #[arg(short, long)]
    pub quiet: bool,

    /// Show task output even when tasks succeed
    #[arg(short, long)]
    pub verbose: bool,

    /// Print additional debug information
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    /// Execute the run and return the process exit code.
    pub fn execute(self) -> Result<i32> {
        commands::run::execute(self)
    }
}
