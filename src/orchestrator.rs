//! # Run Orchestration
//!
//! Sequences one complete run: inspect, match, chunk, back up, execute,
//! reconcile, and report. This is the only module holding cross-component
//! state; data flows strictly downward through the others.
//!
//! A run is successful if and only if every chunk result across every group
//! succeeded, or no group matched at all (a no-op run is always successful).
//! One failed chunk fails its group and the whole run, but unrelated chunks
//! still finish so diagnostics are complete — unless fail-fast was requested.
//!
//! ## Interrupts
//!
//! SIGINT never terminates the process mid-run. The handler calls
//! [`Interrupt::request_stop`], which only sets the cooperative cancellation
//! flag: running chunks finish, unstarted chunks are skipped (and counted as
//! failures), and the run proceeds to reconciliation. Restoration is a
//! critical section — once entered it runs to completion, and the handler
//! can consult [`Interrupt::in_critical_section`] to tell the user why the
//! second Ctrl-C is also being ignored.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::chunker::{self, TaskChunk};
use crate::config::TaskSpec;
use crate::context::RunContext;
use crate::error::Result;
use crate::matcher::{self, TaskGroup};
use crate::repo::GitRepo;
use crate::runner::TaskResult;
use crate::scheduler::{self, CancelFlag};
use crate::stash::StashController;

/// Terminal disposition of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Every task succeeded; task edits to staged paths were re-staged.
    Applied,
    /// At least one task failed or the tree could not be reconciled; the
    /// snapshot was restored (or, with backup disabled, the failure was
    /// reported without restoration).
    Reverted,
    /// No task group had matches; nothing executed.
    NoOp,
}

/// All results of one group, in chunk order.
#[derive(Debug)]
pub struct GroupReport {
    pub label: String,
    pub results: Vec<TaskResult>,
}

impl GroupReport {
    pub fn success(&self) -> bool {
        self.results.iter().all(TaskResult::success)
    }
}

/// Aggregate outcome of a run.
#[derive(Debug)]
pub struct RunOutcome {
    pub disposition: Disposition,
    /// Group reports in declaration order.
    pub groups: Vec<GroupReport>,
    /// Non-fatal conditions surfaced to the user (degraded backup, ...).
    pub warnings: Vec<String>,
    /// Why a reverted run was reverted.
    pub failure_reason: Option<String>,
}

impl RunOutcome {
    pub fn ok(&self) -> bool {
        matches!(self.disposition, Disposition::Applied | Disposition::NoOp)
    }

    /// Process exit code: 0 for Applied and NoOp, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.ok() {
            0
        } else {
            1
        }
    }

    fn no_op() -> Self {
        Self {
            disposition: Disposition::NoOp,
            groups: Vec::new(),
            warnings: Vec::new(),
            failure_reason: None,
        }
    }
}

/// Shared interrupt state consulted by the signal handler.
///
/// Modeled as an explicit guard pair instead of ambient global state: the
/// orchestrator flips the critical flag around restoration, and the handler
/// only ever requests cooperative cancellation.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    cancel: CancelFlag,
    critical: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cancellation flag checked between chunk dispatches.
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Called from the signal handler: stop scheduling new chunks.
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    /// Whether a restore is in progress and must not be disturbed.
    pub fn in_critical_section(&self) -> bool {
        self.critical.load(Ordering::SeqCst)
    }

    fn enter_critical(&self) -> CriticalSection<'_> {
        self.critical.store(true, Ordering::SeqCst);
        CriticalSection(&self.critical)
    }
}

/// Scoped guard for the reconcile/restore critical section.
struct CriticalSection<'flag>(&'flag AtomicBool);

impl Drop for CriticalSection<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Execute one complete run.
///
/// Returns `Err` only for run-level failures (unreadable repository state);
/// task failures and reconciliation conflicts are reported through the
/// returned [`RunOutcome`].
pub fn run(ctx: &RunContext, specs: &[TaskSpec], interrupt: &Interrupt) -> Result<RunOutcome> {
    let repo = GitRepo::discover(&ctx.cwd)?;
    let initial = repo.capture_state()?;

    if initial.is_empty() {
        info!("no staged files; nothing to do");
        return Ok(RunOutcome::no_op());
    }

    let groups = matcher::match_tasks(&initial, specs)?;
    if groups.is_empty() {
        info!("no staged files match any configured task");
        return Ok(RunOutcome::no_op());
    }

    let mut chunks: Vec<TaskChunk> = Vec::new();
    for (index, group) in groups.iter().enumerate() {
        chunks.extend(chunker::chunk_group(group, index, ctx, repo.root())?);
    }
    debug!("{} groups produced {} chunks", groups.len(), chunks.len());

    let mut controller = StashController::new(&repo, ctx.backup);
    controller.backup()?;
    let mut warnings: Vec<String> = controller.warning().map(str::to_string).into_iter().collect();
    for chunk in chunks.iter().filter(|c| c.oversized) {
        warnings.push(format!(
            "{}: a single path exceeds the command-line length limit",
            chunk.label
        ));
    }

    controller.begin_tasks();
    let results = match scheduler::run_all(&chunks, ctx, repo.root(), interrupt.cancel_flag()) {
        Ok(results) => results,
        Err(error) => {
            // The pool never came up; nothing ran, but restore anyway so a
            // partially mutated tree is impossible.
            let _critical = interrupt.enter_critical();
            controller.revert()?;
            return Err(error);
        }
    };

    // Restoration must run to completion once entered; SIGINT is ignored
    // until the guard drops.
    let critical = interrupt.enter_critical();
    controller.begin_reconciling();

    let all_success = results.iter().all(TaskResult::success);
    let mut failure_reason = None;

    let disposition = if all_success {
        let matched: BTreeSet<String> = groups.iter().flat_map(|g| g.files.clone()).collect();
        let matched: Vec<String> = matched.into_iter().collect();
        match controller.apply(&matched, &initial, ctx.allow_empty) {
            Ok(()) => Disposition::Applied,
            Err(error) => {
                warn!("reconciliation failed: {}", error);
                failure_reason = Some(error.to_string());
                controller.revert()?;
                Disposition::Reverted
            }
        }
    } else {
        let failed = results.iter().filter(|r| !r.success()).count();
        failure_reason = Some(if interrupt.cancel_flag().is_cancelled() {
            format!("{} task invocations failed or were skipped", failed)
        } else {
            format!("{} task invocations failed", failed)
        });
        controller.revert()?;
        Disposition::Reverted
    };
    drop(critical);

    if disposition == Disposition::Reverted && !controller.backup_enabled() {
        warnings.push(
            "backup was disabled; task changes were left in the working tree".to_string(),
        );
    }

    Ok(RunOutcome {
        disposition,
        groups: group_results(&groups, results),
        warnings,
        failure_reason,
    })
}

/// Attribute chunk results back to their groups, preserving declaration
/// order regardless of completion order.
fn group_results(groups: &[TaskGroup], results: Vec<TaskResult>) -> Vec<GroupReport> {
    let mut reports: Vec<GroupReport> = groups
        .iter()
        .map(|group| GroupReport {
            label: group.label().to_string(),
            results: Vec::new(),
        })
        .collect();

    for result in results {
        reports[result.group_index].results.push(result);
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TaskStatus;
    use std::time::Duration;

    fn result_for(group_index: usize, status: TaskStatus) -> TaskResult {
        TaskResult {
            group_index,
            label: format!("group-{}", group_index),
            command: "cmd".to_string(),
            file_count: 1,
            status,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    fn group_labeled(pattern: &str) -> TaskGroup {
        TaskGroup {
            spec: TaskSpec {
                pattern: pattern.to_string(),
                commands: vec!["cmd".to_string()],
            },
            files: vec!["a".to_string()],
        }
    }

    #[test]
    fn test_group_results_reattributes_out_of_order() {
        let groups = vec![group_labeled("*.js"), group_labeled("*.css")];
        let results = vec![
            result_for(1, TaskStatus::Success),
            result_for(0, TaskStatus::Failed(1)),
            result_for(1, TaskStatus::Success),
        ];

        let reports = group_results(&groups, results);
        assert_eq!(reports[0].label, "*.js");
        assert_eq!(reports[0].results.len(), 1);
        assert!(!reports[0].success());
        assert_eq!(reports[1].results.len(), 2);
        assert!(reports[1].success());
    }

    #[test]
    fn test_outcome_exit_codes() {
        let applied = RunOutcome {
            disposition: Disposition::Applied,
            groups: Vec::new(),
            warnings: Vec::new(),
            failure_reason: None,
        };
        assert_eq!(applied.exit_code(), 0);

        let noop = RunOutcome::no_op();
        assert_eq!(noop.exit_code(), 0);
        assert!(noop.ok());

        let reverted = RunOutcome {
            disposition: Disposition::Reverted,
            groups: Vec::new(),
            warnings: Vec::new(),
            failure_reason: Some("1 task invocations failed".to_string()),
        };
        assert_eq!(reverted.exit_code(), 1);
        assert!(!reverted.ok());
    }

    #[test]
    fn test_critical_section_guard_scopes_flag() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.in_critical_section());
        {
            let _guard = interrupt.enter_critical();
            assert!(interrupt.in_critical_section());
        }
        assert!(!interrupt.in_critical_section());
    }

    #[test]
    fn test_request_stop_sets_cancel_flag() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.cancel_flag().is_cancelled());
        interrupt.request_stop();
        assert!(interrupt.cancel_flag().is_cancelled());
    }
}
