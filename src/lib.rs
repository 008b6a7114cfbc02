//! # Stagehand Library
//!
//! This library provides the core functionality for running user-defined
//! tasks against the staged files of a git repository. It is designed to be
//! used by the `stagehand` command-line tool but can also be embedded in
//! other applications (commit hooks, editor integrations) that need the same
//! guarantees.
//!
//! ## Quick Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use stagehand::config;
//! use stagehand::context::RunContext;
//! use stagehand::orchestrator::{self, Interrupt};
//!
//! let tasks = config::parse(r#""*.rs": cargo fmt --"#).unwrap();
//! let ctx = RunContext::new(PathBuf::from("."));
//! let outcome = orchestrator::run(&ctx, &tasks, &Interrupt::new()).unwrap();
//! std::process::exit(outcome.exit_code());
//! ```
//!
//! ## Core Concepts
//!
//! The library is built around a few key concepts:
//!
//! - **Configuration (`config`)**: an ordered mapping of glob patterns to
//!   command templates, loaded from `.stagehand.yaml` or stdin.
//! - **Repository Inspection (`repo`)**: captures the staged/unstaged path
//!   sets once per run and provides stash-based snapshots of the tree.
//! - **Matching (`matcher`)**: binds each pattern to the staged paths it
//!   matches, producing task groups in declaration order.
//! - **Chunking (`chunker`)**: splits oversized file lists across multiple
//!   invocations to respect command-line length limits.
//! - **Execution (`runner`, `scheduler`)**: runs chunks as child processes
//!   on a bounded worker pool, folding every failure into structured results.
//! - **Safety (`stash`)**: the backup/reconcile/revert state machine that
//!   guarantees no uncommitted work is lost, whatever the tasks did.
//!
//! ## Execution Flow
//!
//! The main entry point is [`orchestrator::run`], which sequences:
//!
//! 1. **Inspect**: capture the staged and unstaged path sets.
//! 2. **Match**: build task groups from the configured patterns.
//! 3. **Chunk**: split oversized argument lists per platform limits.
//! 4. **Back up**: snapshot the tree (degrading with a warning on failure).
//! 5. **Run**: execute chunks with bounded concurrency.
//! 6. **Reconcile**: re-stage task edits on success, or restore the
//!    snapshot on any failure.
//! 7. **Report**: return a structured outcome for rendering.

pub mod chunker;
pub mod config;
pub mod context;
pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod output;
pub mod repo;
pub mod runner;
pub mod scheduler;
pub mod stash;

#[cfg(test)]
mod chunker_proptest;
