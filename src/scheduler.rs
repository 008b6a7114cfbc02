//! # Concurrency Scheduling
//!
//! Runs task chunks on a bounded worker pool. The pool is a dedicated rayon
//! thread pool sized to the configured concurrency limit: a limit of 1 gives
//! strictly sequential execution, unbounded sizes the pool to the number of
//! chunks so everything runs at once. Workers block on child-process
//! completion, so the pool never busy-polls.
//!
//! Chunks of the same group may run concurrently with each other and with
//! chunks of other groups; there is no ordering dependency between groups.
//! Results come back attributed to their originating group and in input
//! order regardless of completion order, which keeps reporting deterministic.
//!
//! Cancellation is cooperative: the shared flag is checked once before each
//! chunk is dispatched. A chunk that was cancelled before starting is
//! recorded as a skipped failure; chunks already running finish normally.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use rayon::prelude::*;

use crate::chunker::TaskChunk;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::runner::{self, TaskResult};

/// Shared cooperative cancellation flag.
///
/// Set by the SIGINT handler or by fail-fast; consulted between chunk
/// dispatches, never used to kill an in-flight process.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run every chunk with at most the configured number of live processes.
///
/// Results are returned in the same order as `chunks`, which the caller
/// builds in group declaration order. Individual spawn failures are folded
/// into failed results and never abort sibling chunks; with fail-fast
/// enabled the first failure cancels all not-yet-started chunks.
pub fn run_all(
    chunks: &[TaskChunk],
    ctx: &RunContext,
    working_dir: &Path,
    cancel: &CancelFlag,
) -> Result<Vec<TaskResult>> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let pool_size = ctx.concurrency.pool_size(chunks.len());
    debug!(
        "scheduling {} chunks on {} workers",
        chunks.len(),
        pool_size
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(pool_size)
        .thread_name(|i| format!("stagehand-worker-{}", i))
        .build()
        .map_err(|e| Error::Spawn {
            command: "worker pool".to_string(),
            message: e.to_string(),
        })?;

    let fail_fast = ctx.fail_fast;
    let results: Vec<TaskResult> = pool.install(|| {
        chunks
            .par_iter()
            .map(|chunk| {
                if cancel.is_cancelled() {
                    debug!("skipping {} (run cancelled)", chunk.label);
                    return TaskResult::skipped(chunk);
                }
                if chunk.oversized {
                    warn!(
                        "{}: a single path exceeds the command-line length limit; \
                         running it in its own invocation",
                        chunk.label
                    );
                }

                let result = match runner::run(chunk, working_dir) {
                    Ok(result) => result,
                    Err(error) => TaskResult::spawn_failed(chunk, &error),
                };

                if !result.success() && fail_fast {
                    cancel.cancel();
                }
                result
            })
            .collect()
    });

    Ok(results)
}
