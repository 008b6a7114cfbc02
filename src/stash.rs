//! # Stash-Backed Working-Tree Safety
//!
//! The [`StashController`] owns the per-run state machine that guarantees
//! the repository ends in a safe, predictable state no matter which tasks
//! succeeded, failed, or silently produced nothing:
//!
//! ```text
//! Clean -> BackedUp -> TasksRunning -> Reconciling -> Applied
//!                                                  \-> Reverted
//! ```
//!
//! Entering `BackedUp` is a precondition for running any task while backup
//! is enabled. A failed backup does not abort the run: the controller
//! degrades to no-restore-guarantee mode and records a warning for the
//! reporter, because refusing to lint is worse than lint-without-a-net.
//!
//! On the applied path, only task modifications to originally-staged paths
//! are re-staged; unstaged-at-start work outside the staged set is never
//! staged and never discarded. A matched path that goes missing, or one that
//! carried both staged and unstaged edits at capture time, cannot be
//! reconciled and forces the reverted path instead.

use std::collections::BTreeSet;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::repo::{GitRepo, Snapshot, StagedFileSet};

/// Phase of the per-run safety state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StashState {
    /// Before any task executes.
    Clean,
    /// A snapshot exists (or backup is disabled) and tasks may start.
    BackedUp,
    /// Task chunks are executing; the tree may be mutated arbitrarily.
    TasksRunning,
    /// All tasks finished; deciding which changes to keep.
    Reconciling,
    /// Terminal: task edits to staged paths were re-staged.
    Applied,
    /// Terminal: the tree was restored to the snapshot, or — with backup
    /// disabled — the failure was reported without restoration.
    Reverted,
}

/// Guards working-tree safety across one run.
pub struct StashController<'repo> {
    repo: &'repo GitRepo,
    enabled: bool,
    snapshot: Option<Snapshot>,
    state: StashState,
    warning: Option<String>,
}

impl<'repo> StashController<'repo> {
    pub fn new(repo: &'repo GitRepo, enabled: bool) -> Self {
        Self {
            repo,
            enabled,
            snapshot: None,
            state: StashState::Clean,
            warning: None,
        }
    }

    pub fn state(&self) -> StashState {
        self.state
    }

    /// Whether a restore is possible if something goes wrong.
    pub fn backup_enabled(&self) -> bool {
        self.enabled
    }

    /// Warning produced by a degraded backup, for the reporter.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Create the pre-run snapshot. `Clean -> BackedUp`.
    ///
    /// A [`Error::Snapshot`] failure degrades to backup-disabled mode with a
    /// recorded warning instead of propagating; anything else is fatal.
    pub fn backup(&mut self) -> Result<()> {
        debug_assert_eq!(self.state, StashState::Clean);

        if self.enabled {
            match self.repo.snapshot() {
                Ok(snapshot) => self.snapshot = Some(snapshot),
                Err(Error::Snapshot { message }) => {
                    let warning = format!(
                        "could not back up the working tree ({}); \
                         continuing without failure recovery",
                        message
                    );
                    warn!("{}", warning);
                    self.warning = Some(warning);
                    self.enabled = false;
                }
                Err(other) => return Err(other),
            }
        }

        self.state = StashState::BackedUp;
        Ok(())
    }

    /// `BackedUp -> TasksRunning`.
    pub fn begin_tasks(&mut self) {
        debug_assert_eq!(self.state, StashState::BackedUp);
        self.state = StashState::TasksRunning;
    }

    /// `TasksRunning -> Reconciling`.
    pub fn begin_reconciling(&mut self) {
        debug_assert_eq!(self.state, StashState::TasksRunning);
        self.state = StashState::Reconciling;
    }

    /// Keep task edits: re-stage matched paths that changed relative to the
    /// snapshot, then verify the result. `Reconciling -> Applied`.
    ///
    /// Errors leave the controller in `Reconciling`; the caller is expected
    /// to follow up with [`revert`](Self::revert).
    pub fn apply(
        &mut self,
        matched: &[String],
        initial: &StagedFileSet,
        allow_empty: bool,
    ) -> Result<()> {
        debug_assert_eq!(self.state, StashState::Reconciling);

        let overlap: BTreeSet<String> = initial.overlap();
        for path in matched {
            if overlap.contains(path) {
                return Err(Error::Reconciliation {
                    path: path.clone(),
                    message: "file has both staged and unstaged changes; \
                              task edits cannot be separated from unstaged work"
                        .to_string(),
                });
            }
            if !self.repo.root().join(path).exists() {
                return Err(Error::Reconciliation {
                    path: path.clone(),
                    message: "file was staged before the run but is now missing".to_string(),
                });
            }
        }

        let modified = self.repo.modified_among(matched)?;
        if !modified.is_empty() {
            debug!("re-staging {} task-modified paths", modified.len());
            let paths: Vec<String> = modified.into_iter().collect();
            self.repo.add(&paths)?;
        }

        // Guard against producing an empty commit when task edits cancelled
        // out everything that was staged.
        let staged_now = self.repo.capture_state()?.staged;
        if staged_now.is_empty() && !allow_empty {
            return Err(Error::Reconciliation {
                path: "<index>".to_string(),
                message: "tasks reverted all staged changes; \
                          use --allow-empty to permit an empty result"
                    .to_string(),
            });
        }

        self.state = StashState::Applied;
        self.discard();
        Ok(())
    }

    /// Undo all task-made changes by restoring the snapshot.
    /// `Reconciling -> Reverted`.
    ///
    /// With backup disabled this performs no restoration; the terminal state
    /// then only records that the failure was reported as-is.
    pub fn revert(&mut self) -> Result<()> {
        debug_assert!(matches!(
            self.state,
            StashState::Reconciling | StashState::BackedUp | StashState::TasksRunning
        ));

        if let Some(snapshot) = self.snapshot.as_mut() {
            self.repo.restore(snapshot)?;
        } else if self.enabled {
            warn!("revert requested but no snapshot exists");
        }

        self.state = StashState::Reverted;
        self.discard();
        Ok(())
    }

    /// Release the snapshot's temporary storage; never fatal.
    fn discard(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.repo.discard(snapshot);
        }
    }
}
