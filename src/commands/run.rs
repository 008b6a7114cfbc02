//! Run command implementation
//!
//! Wires CLI flags into a `RunContext`, loads the task configuration,
//! installs the SIGINT handler, and executes the engine. All rendering goes
//! to stderr so task stdout piping stays clean.

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use stagehand::config::{self, TaskSpec};
use stagehand::context::{default_max_arg_length, Concurrency, RunContext, ShellMode};
use stagehand::orchestrator::{self, Interrupt};
use stagehand::output::{OutputConfig, Reporter};

use crate::cli::Cli;

/// Execute the run and return the process exit code.
pub fn execute(args: Cli) -> anyhow::Result<i32> {
    init_logging(args.debug);

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let tasks = load_tasks(&args, &cwd)?;
    let ctx = build_context(&args, cwd)?;
    debug!("run context: {:?}", ctx);

    let interrupt = Interrupt::new();
    install_signal_handler(&interrupt)?;

    let spinner = make_spinner(args.quiet);
    let outcome = orchestrator::run(&ctx, &tasks, &interrupt);
    spinner.finish_and_clear();

    let outcome = outcome?;
    let reporter = Reporter::new(OutputConfig::from_env(), args.quiet, args.verbose);
    reporter.print_outcome(&mut std::io::stderr().lock(), &outcome)?;

    Ok(outcome.exit_code())
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    // Tests may initialize more than once.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

fn load_tasks(args: &Cli, cwd: &PathBuf) -> anyhow::Result<Vec<TaskSpec>> {
    match args.config.as_deref() {
        Some("-") => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("cannot read configuration from stdin")?;
            Ok(config::parse(&content)?)
        }
        Some(path) => Ok(config::from_file(std::path::Path::new(path))?),
        None => {
            let found = config::discover(cwd).with_context(|| {
                format!(
                    "no configuration found; create one of {} or pass --config",
                    config::CONFIG_FILE_NAMES.join(", ")
                )
            })?;
            debug!("using configuration {}", found.display());
            Ok(config::from_file(&found)?)
        }
    }
}

fn build_context(args: &Cli, cwd: PathBuf) -> anyhow::Result<RunContext> {
    let mut ctx = RunContext::new(cwd);
    ctx.concurrency = parse_concurrency(&args.concurrent)?;
    ctx.max_arg_length = args.max_arg_length.unwrap_or_else(default_max_arg_length);
    ctx.allow_empty = args.allow_empty;
    ctx.relative = args.relative;
    ctx.backup = !args.no_stash;
    ctx.fail_fast = args.fail_fast;
    ctx.shell = match &args.shell {
        Some(shell) => ShellMode::Shell(PathBuf::from(shell)),
        None => ShellMode::Direct,
    };
    ctx.verbose = args.verbose;
    Ok(ctx)
}

fn parse_concurrency(value: &str) -> anyhow::Result<Concurrency> {
    match value {
        "true" => Ok(Concurrency::Unbounded),
        "false" => Ok(Concurrency::Limited(1)),
        other => match other.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Concurrency::Limited(n)),
            _ => bail!("--concurrent expects a positive number or \"false\", got `{}`", other),
        },
    }
}

fn install_signal_handler(interrupt: &Interrupt) -> anyhow::Result<()> {
    let handle = interrupt.clone();
    ctrlc::set_handler(move || {
        handle.request_stop();
        if handle.in_critical_section() {
            eprintln!("stagehand: restoring the working tree; please wait...");
        } else {
            eprintln!("stagehand: interrupt received, finishing running tasks...");
        }
    })
    .context("cannot install interrupt handler")?;
    Ok(())
}

fn make_spinner(quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Running tasks for staged files...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
