//! # CLI Command Implementation
//!
//! `stagehand` is a single-purpose tool, so there is exactly one command:
//! [`run::execute`] wires parsed flags into a
//! [`RunContext`](stagehand::context::RunContext), loads the task
//! configuration, installs the SIGINT handler, and hands off to the library
//! orchestrator, translating the outcome into an exit code.

pub mod run;
