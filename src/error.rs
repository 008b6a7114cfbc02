//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for
//! `stagehand`. It uses the `thiserror` library to create a comprehensive
//! `Error` enum that covers all anticipated failure modes, providing clear
//! and descriptive error messages.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum that represents all possible errors that can
//!   occur within the application. Each variant corresponds to a specific
//!   type of error and includes contextual information to aid in debugging.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the application to simplify function signatures.
//!
//! ## Severity Tiers
//!
//! Not every variant is fatal for a whole run:
//!
//! - `RepoState` aborts before any task runs — the repository cannot be read.
//! - `Snapshot` degrades the run to no-restore-guarantee mode with a warning;
//!   the run itself proceeds.
//! - `Spawn` is fatal only for the single task invocation that could not be
//!   started; it is captured into that invocation's result and never unwinds
//!   past the scheduler.
//! - `Reconciliation` forces the whole run into the reverted state.
//!
//! A task exiting non-zero is deliberately *not* an `Error` variant: it is
//! ordinary result data carried on [`crate::runner::TaskResult`].

use thiserror::Error;

/// Main error type for stagehand operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while locating or parsing the task configuration.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The repository state could not be read.
    ///
    /// Raised when the working directory is not inside a git repository, or
    /// the index cannot be enumerated. Always fatal, and always raised before
    /// any task has run.
    #[error("Failed to read repository state: {message}")]
    RepoState { message: String },

    /// A working-tree backup could not be created or persisted.
    ///
    /// The run continues without failure-recovery guarantees; callers surface
    /// this as a warning rather than aborting.
    #[error("Failed to back up the working tree: {message}")]
    Snapshot { message: String },

    /// A task process could not be started at all.
    ///
    /// Missing executable or permission denied. Fatal for the single
    /// invocation only; the scheduler records it as a failed result.
    #[error("Failed to spawn task `{command}`: {message}")]
    Spawn { command: String, message: String },

    /// The working tree changed in a way inconsistent with the snapshot.
    ///
    /// For example an expected file went missing, or a file carried both
    /// staged and unstaged modifications that cannot be separated. Forces the
    /// run into the reverted state.
    #[error("Reconciliation conflict for {path}: {message}")]
    Reconciliation { path: String, message: String },

    /// An invoked git command exited non-zero.
    #[error("git {command} failed: {stderr}")]
    GitCommand { command: String, stderr: String },

    /// A command template could not be split into an argument vector.
    #[error("Cannot parse task command `{command}`: {message}")]
    CommandParse { command: String, message: String },

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
