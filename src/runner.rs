//! # Task Execution
//!
//! Runs one [`TaskChunk`] as a child process and reports a structured
//! [`TaskResult`]. A non-zero exit is ordinary result data, never an error;
//! only the inability to spawn the process at all raises, and even that is
//! folded into a failed result by the scheduler.
//!
//! The runner does not sandbox the child: tasks are expected to read and
//! rewrite the files they were handed, and that trust boundary belongs to
//! whoever wrote the configuration.

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use log::debug;

use crate::chunker::{Invocation, TaskChunk};
use crate::error::{Error, Result};

/// Completion classification for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Exited with code 0.
    Success,
    /// Exited with a non-zero code.
    Failed(i32),
    /// Terminated by a signal before exiting.
    Killed(i32),
    /// The process could not be started at all.
    SpawnFailed(String),
    /// Never started because the run was cancelled first. Counted as a
    /// failure for safety.
    Skipped,
}

/// Immutable record of one chunk execution.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Index of the originating group, in declaration order.
    pub group_index: usize,
    /// Human-readable chunk label, e.g. `*.rs [2/3]`.
    pub label: String,
    /// The command template that ran.
    pub command: String,
    /// Number of file arguments in this chunk.
    pub file_count: usize,
    pub status: TaskStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl TaskResult {
    pub fn success(&self) -> bool {
        self.status == TaskStatus::Success
    }

    /// Exit code to report: actual code, or a conventional value for
    /// signal/spawn/skip outcomes.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            TaskStatus::Success => 0,
            TaskStatus::Failed(code) => code,
            TaskStatus::Killed(signal) => 128 + signal,
            TaskStatus::SpawnFailed(_) | TaskStatus::Skipped => -1,
        }
    }

    /// A result for a chunk that was cancelled before starting.
    pub fn skipped(chunk: &TaskChunk) -> Self {
        Self {
            group_index: chunk.group_index,
            label: chunk.label.clone(),
            command: chunk.command.clone(),
            file_count: chunk.files.len(),
            status: TaskStatus::Skipped,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    /// A result for a chunk whose process could not be spawned.
    pub fn spawn_failed(chunk: &TaskChunk, error: &Error) -> Self {
        Self {
            group_index: chunk.group_index,
            label: chunk.label.clone(),
            command: chunk.command.clone(),
            file_count: chunk.files.len(),
            status: TaskStatus::SpawnFailed(error.to_string()),
            stdout: String::new(),
            stderr: error.to_string(),
            duration: Duration::ZERO,
        }
    }
}

/// Execute one chunk to completion in `working_dir`.
///
/// Returns `Err` only for spawn failures ([`Error::Spawn`]); every completed
/// process, whatever its exit status, produces `Ok`.
pub fn run(chunk: &TaskChunk, working_dir: &Path) -> Result<TaskResult> {
    let (mut command, program) = match &chunk.invocation {
        Invocation::Argv(argv) => {
            let mut cmd = Command::new(&argv[0]);
            cmd.args(&argv[1..]);
            (cmd, argv[0].clone())
        }
        Invocation::Shell { shell, command_line } => {
            let mut cmd = Command::new(shell);
            cmd.arg("-c").arg(command_line);
            (cmd, shell.display().to_string())
        }
    };
    command.current_dir(working_dir);

    debug!("running {} ({} files)", chunk.label, chunk.files.len());
    let started = Instant::now();
    let output = command.output().map_err(|e| Error::Spawn {
        command: chunk.command.clone(),
        message: format!("cannot start `{}`: {}", program, e),
    })?;
    let duration = started.elapsed();

    let status = match output.status.code() {
        Some(0) => TaskStatus::Success,
        Some(code) => TaskStatus::Failed(code),
        None => TaskStatus::Killed(signal_of(&output.status)),
    };

    Ok(TaskResult {
        group_index: chunk.group_index,
        label: chunk.label.clone(),
        command: chunk.command.clone(),
        file_count: chunk.files.len(),
        status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration,
    })
}

#[cfg(unix)]
fn signal_of(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().unwrap_or(0)
}

#[cfg(not(unix))]
fn signal_of(_status: &std::process::ExitStatus) -> i32 {
    0
}
