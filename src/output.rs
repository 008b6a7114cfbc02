//! # Output Configuration and Reporting
//!
//! Rendering of run results for humans, plus the color/emoji handling it
//! depends on. The engine itself only produces structured
//! [`RunOutcome`](crate::orchestrator::RunOutcome) values; everything
//! user-visible happens here.
//!
//! ## Respecting User Preferences
//!
//! Color detection honors:
//! - `NO_COLOR` - disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - disables colors
//! - `CLICOLOR_FORCE=1` - forces colors even in non-TTY
//! - `TERM=dumb` - disables colors for dumb terminals

use std::env;
use std::io::Write;
use std::time::Duration;

use console::style;

use crate::orchestrator::{Disposition, GroupReport, RunOutcome};
use crate::runner::{TaskResult, TaskStatus};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Detect color support from the environment.
    pub fn from_env() -> Self {
        Self {
            use_color: Self::detect_color_support(),
        }
    }

    fn detect_color_support() -> bool {
        // The presence of NO_COLOR (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stderr().features().colors_supported()
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Returns the emoji when colors are enabled, the plain marker otherwise.
pub fn emoji<'glyph>(config: &OutputConfig, emoji_str: &'glyph str, plain: &'glyph str) -> &'glyph str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Renders run results to a writer (stderr in the CLI).
///
/// Failed task output is always shown; successful task output only when
/// verbose is requested. Quiet mode suppresses everything except failures.
pub struct Reporter {
    config: OutputConfig,
    quiet: bool,
    verbose: bool,
}

impl Reporter {
    pub fn new(config: OutputConfig, quiet: bool, verbose: bool) -> Self {
        Self {
            config,
            quiet,
            verbose,
        }
    }

    /// Render the complete outcome of a run.
    pub fn print_outcome<W: Write>(&self, out: &mut W, outcome: &RunOutcome) -> std::io::Result<()> {
        for warning in &outcome.warnings {
            writeln!(
                out,
                "{} {}",
                emoji(&self.config, "⚠️", "[WARN]"),
                self.paint_yellow(warning)
            )?;
        }

        for group in &outcome.groups {
            self.print_group(out, group)?;
        }

        self.print_disposition(out, outcome)
    }

    fn print_group<W: Write>(&self, out: &mut W, group: &GroupReport) -> std::io::Result<()> {
        if self.quiet && group.success() {
            return Ok(());
        }

        let mark = if group.success() {
            self.paint_green(emoji(&self.config, "✔", "[OK]"))
        } else {
            self.paint_red(emoji(&self.config, "✖", "[FAIL]"))
        };
        writeln!(out, "{} {}", mark, group.label)?;

        for result in &group.results {
            self.print_result(out, result)?;
        }
        Ok(())
    }

    fn print_result<W: Write>(&self, out: &mut W, result: &TaskResult) -> std::io::Result<()> {
        let show_output = !result.success() || self.verbose;
        if !show_output {
            return Ok(());
        }

        let detail = match &result.status {
            TaskStatus::Success => "ok".to_string(),
            TaskStatus::Failed(code) => format!("exit code {}", code),
            TaskStatus::Killed(signal) => format!("killed by signal {}", signal),
            TaskStatus::SpawnFailed(message) => format!("could not start: {}", message),
            TaskStatus::Skipped => "skipped".to_string(),
        };
        writeln!(
            out,
            "  {} `{}` ({} files, {}, {})",
            self.paint_dim(&result.label),
            result.command,
            result.file_count,
            detail,
            format_duration(result.duration)
        )?;

        for line in result.stdout.lines() {
            writeln!(out, "    {}", line)?;
        }
        for line in result.stderr.lines() {
            writeln!(out, "    {}", self.paint_red(line))?;
        }
        Ok(())
    }

    fn print_disposition<W: Write>(&self, out: &mut W, outcome: &RunOutcome) -> std::io::Result<()> {
        match outcome.disposition {
            Disposition::Applied => {
                if !self.quiet {
                    writeln!(
                        out,
                        "{} {}",
                        emoji(&self.config, "✨", "[DONE]"),
                        self.paint_green("All tasks passed; staged changes updated")
                    )?;
                }
            }
            Disposition::NoOp => {
                if !self.quiet {
                    writeln!(out, "No staged files match any configured task")?;
                }
            }
            Disposition::Reverted => {
                let reason = outcome
                    .failure_reason
                    .as_deref()
                    .unwrap_or("a task failed");
                writeln!(
                    out,
                    "{} {}",
                    emoji(&self.config, "↩️", "[REVERTED]"),
                    self.paint_red(&format!(
                        "Run reverted: {}; the working tree was restored to its pre-run state",
                        reason
                    ))
                )?;
            }
        }
        Ok(())
    }

    fn paint_green(&self, text: &str) -> String {
        if self.config.use_color {
            style(text).green().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_red(&self, text: &str) -> String {
        if self.config.use_color {
            style(text).red().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_yellow(&self, text: &str) -> String {
        if self.config.use_color {
            style(text).yellow().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_dim(&self, text: &str) -> String {
        if self.config.use_color {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }
}

fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis >= 1000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", millis)
    }
}
