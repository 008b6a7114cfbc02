//! # Repository Inspection and Snapshots
//!
//! This module is the only place stagehand talks to git. It uses the system
//! git command rather than a reimplementation, which automatically handles
//! every repository layout, hook setup, and config quirk the user already
//! has working.
//!
//! Two concerns live here:
//!
//! - **Inspection**: enumerating staged paths and unstaged modifications into
//!   a [`StagedFileSet`], captured once per run and treated as ground truth.
//! - **Snapshots**: creating, restoring, and discarding a stash-based backup
//!   of the working tree. A [`Snapshot`] records both worktree content and
//!   index state, so a restore brings back exactly the pre-run staging.
//!
//! The state machine deciding *when* to snapshot and restore lives in
//! [`crate::stash`]; this module only provides the primitive operations.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use log::{debug, warn};

use crate::chunker;
use crate::error::{Error, Result};

/// Stash subject used to identify stagehand's own backup entries.
const BACKUP_MESSAGE: &str = "stagehand automatic backup";

/// Serialized length cap for path arguments passed to a single git
/// invocation; conservative enough for every supported platform. Larger
/// path lists are split across invocations.
const GIT_ARG_LIMIT: usize = 32_768;

/// The staged and unstaged path sets at run start.
///
/// Captured once per run and never re-read mid-run; every later decision
/// about what "no changes" and "safe to restore" mean is made against this.
/// Paths are repository-root-relative, as git reports them.
#[derive(Debug, Clone, Default)]
pub struct StagedFileSet {
    /// Paths recorded in the index for the next commit (added, copied,
    /// modified or renamed; deletions are excluded so tasks never receive a
    /// path that no longer exists).
    pub staged: BTreeSet<String>,
    /// Paths whose working-tree content differs from the index.
    pub unstaged: BTreeSet<String>,
}

impl StagedFileSet {
    /// Paths that carry both staged and unstaged modifications.
    ///
    /// Task edits on such a path cannot be separated from the user's
    /// unstaged edits, so reconciliation treats them as conflicts.
    pub fn overlap(&self) -> BTreeSet<String> {
        self.staged.intersection(&self.unstaged).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

/// A saved, restorable copy of working-tree content and index state.
///
/// Backed by a stored git stash commit. Consumed exactly once: either
/// discarded on success or restored on failure. `restore` is idempotent.
#[derive(Debug)]
pub struct Snapshot {
    commit: String,
    restored: bool,
}

impl Snapshot {
    /// The stash commit backing this snapshot.
    pub fn commit(&self) -> &str {
        &self.commit
    }
}

/// Handle to a discovered git repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Locate the repository containing `cwd`.
    ///
    /// Fails with [`Error::RepoState`] when `cwd` is not inside a work tree.
    pub fn discover(cwd: &Path) -> Result<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(cwd)
            .output()
            .map_err(|e| Error::RepoState {
                message: format!("cannot execute git: {}", e),
            })?;

        if !output.status.success() {
            return Err(Error::RepoState {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        debug!("discovered repository root at {}", root.display());
        Ok(Self { root })
    }

    /// Repository root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run a git command in the repository root, erroring on non-zero exit.
    fn git(&self, args: &[&str]) -> Result<Output> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::RepoState {
                message: format!("cannot execute git: {}", e),
            })?;

        if !output.status.success() {
            return Err(Error::GitCommand {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }

    /// Run a git command and return trimmed stdout.
    fn git_stdout(&self, args: &[&str]) -> Result<String> {
        let output = self.git(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// NUL-separated path list output of a `git diff --name-only -z` variant.
    fn diff_names(&self, args: &[&str]) -> Result<BTreeSet<String>> {
        let output = self.git(args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Read the staged and unstaged path sets without mutating anything.
    pub fn capture_state(&self) -> Result<StagedFileSet> {
        let staged = self
            .diff_names(&["diff", "--name-only", "-z", "--diff-filter=ACMR", "--staged"])
            .map_err(repo_state)?;
        let unstaged = self
            .diff_names(&["diff", "--name-only", "-z"])
            .map_err(repo_state)?;

        debug!(
            "captured state: {} staged, {} unstaged",
            staged.len(),
            unstaged.len()
        );
        Ok(StagedFileSet { staged, unstaged })
    }

    /// Paths among `paths` whose working-tree content differs from the index.
    ///
    /// After tasks have run this is exactly the set of task modifications,
    /// because the matched paths started out with worktree equal to index.
    /// Long path lists are split across several git invocations so the
    /// kernel argument-length limit is never hit.
    pub fn modified_among(&self, paths: &[String]) -> Result<BTreeSet<String>> {
        let mut modified = BTreeSet::new();
        for (batch, _) in chunker::chunk("git diff --name-only -z --", paths, GIT_ARG_LIMIT) {
            let mut args: Vec<&str> = vec!["diff", "--name-only", "-z", "--"];
            args.extend(batch.iter().map(String::as_str));
            modified.extend(self.diff_names(&args)?);
        }
        Ok(modified)
    }

    /// Persist a restorable copy of the working tree and index.
    ///
    /// Fails with [`Error::Snapshot`] when the backup cannot be guaranteed;
    /// callers degrade to running without recovery rather than aborting.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let commit = self
            .git_stdout(&["stash", "create", BACKUP_MESSAGE])
            .map_err(snapshot_error)?;

        if commit.is_empty() {
            return Err(Error::Snapshot {
                message: "nothing to back up (no tracked changes found)".to_string(),
            });
        }

        // `stash create` leaves a dangling commit; store it so it survives
        // gc and shows up in `git stash list` if stagehand is killed.
        self.git(&["stash", "store", "-m", BACKUP_MESSAGE, &commit])
            .map_err(snapshot_error)?;

        debug!("created backup stash {}", commit);
        Ok(Snapshot {
            commit,
            restored: false,
        })
    }

    /// Revert tracked content and index state to exactly what was captured.
    ///
    /// Idempotent: a second call on the same snapshot is a no-op.
    pub fn restore(&self, snapshot: &mut Snapshot) -> Result<()> {
        if snapshot.restored {
            debug!("snapshot {} already restored, skipping", snapshot.commit);
            return Ok(());
        }

        self.git(&["reset", "--hard", "HEAD"])?;
        self.git(&["stash", "apply", "--index", &snapshot.commit])?;
        snapshot.restored = true;
        debug!("restored backup stash {}", snapshot.commit);
        Ok(())
    }

    /// Release the stored stash entry backing `snapshot`.
    ///
    /// Failure to discard is logged, never fatal — a stale stash entry is
    /// recoverable by hand, a failed run is not.
    pub fn discard(&self, snapshot: Snapshot) {
        match self.find_stash_ref(&snapshot.commit) {
            Ok(Some(stash_ref)) => {
                if let Err(e) = self.git(&["stash", "drop", &stash_ref]) {
                    warn!("could not drop backup stash {}: {}", stash_ref, e);
                }
            }
            Ok(None) => {
                warn!("backup stash {} not found; nothing to discard", snapshot.commit);
            }
            Err(e) => warn!("could not list stashes: {}", e),
        }
    }

    /// Find the `stash@{n}` ref holding the given stash commit.
    fn find_stash_ref(&self, commit: &str) -> Result<Option<String>> {
        let listing = self.git_stdout(&["stash", "list", "--format=%H %gd"])?;
        for line in listing.lines() {
            if let Some((hash, stash_ref)) = line.split_once(' ') {
                if hash == commit {
                    return Ok(Some(stash_ref.to_string()));
                }
            }
        }
        Ok(None)
    }

    /// Re-stage the given repository-relative paths, batching long lists
    /// across several `git add` invocations.
    pub fn add(&self, paths: &[String]) -> Result<()> {
        for (batch, _) in chunker::chunk("git add --", paths, GIT_ARG_LIMIT) {
            let mut args: Vec<&str> = vec!["add", "--"];
            args.extend(batch.iter().map(String::as_str));
            self.git(&args)?;
        }
        Ok(())
    }
}

fn repo_state(error: Error) -> Error {
    Error::RepoState {
        message: error.to_string(),
    }
}

fn snapshot_error(error: Error) -> Error {
    Error::Snapshot {
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn git_in(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            status.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&status.stderr)
        );
    }

    fn scratch_repo() -> (TempDir, GitRepo) {
        let temp = TempDir::new().unwrap();
        git_in(temp.path(), &["init", "--initial-branch=main"]);
        git_in(temp.path(), &["config", "user.email", "test@example.com"]);
        git_in(temp.path(), &["config", "user.name", "Test"]);
        fs::write(temp.path().join("README.md"), "# test\n").unwrap();
        git_in(temp.path(), &["add", "."]);
        git_in(temp.path(), &["commit", "-m", "init"]);
        let repo = GitRepo::discover(temp.path()).unwrap();
        (temp, repo)
    }

    #[test]
    fn test_discover_outside_repository_fails() {
        let temp = TempDir::new().unwrap();
        let result = GitRepo::discover(temp.path());
        assert!(matches!(result, Err(Error::RepoState { .. })));
    }

    #[test]
    fn test_capture_state_clean_repo() {
        let (_temp, repo) = scratch_repo();
        let state = repo.capture_state().unwrap();
        assert!(state.staged.is_empty());
        assert!(state.unstaged.is_empty());
        assert!(state.is_empty());
    }

    #[test]
    fn test_capture_state_staged_and_unstaged() {
        let (temp, repo) = scratch_repo();
        fs::write(temp.path().join("a.rs"), "fn a() {}\n").unwrap();
        git_in(temp.path(), &["add", "a.rs"]);
        fs::write(temp.path().join("README.md"), "# changed\n").unwrap();

        let state = repo.capture_state().unwrap();
        assert!(state.staged.contains("a.rs"));
        assert!(!state.staged.contains("README.md"));
        assert!(state.unstaged.contains("README.md"));
        assert!(state.overlap().is_empty());
    }

    #[test]
    fn test_capture_state_overlap() {
        let (temp, repo) = scratch_repo();
        fs::write(temp.path().join("a.rs"), "fn a() {}\n").unwrap();
        git_in(temp.path(), &["add", "a.rs"]);
        // Unstaged edit on top of the staged one.
        fs::write(temp.path().join("a.rs"), "fn a() { unreachable!() }\n").unwrap();

        let state = repo.capture_state().unwrap();
        assert!(state.overlap().contains("a.rs"));
    }

    #[test]
    fn test_capture_state_excludes_staged_deletions() {
        let (temp, repo) = scratch_repo();
        git_in(temp.path(), &["rm", "README.md"]);

        let state = repo.capture_state().unwrap();
        assert!(!state.staged.contains("README.md"));
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let (temp, repo) = scratch_repo();
        fs::write(temp.path().join("a.rs"), "original\n").unwrap();
        git_in(temp.path(), &["add", "a.rs"]);

        let mut snapshot = repo.snapshot().unwrap();

        // Simulate a destructive task.
        fs::write(temp.path().join("a.rs"), "clobbered\n").unwrap();
        git_in(temp.path(), &["add", "a.rs"]);

        repo.restore(&mut snapshot).unwrap();
        let content = fs::read_to_string(temp.path().join("a.rs")).unwrap();
        assert_eq!(content, "original\n");

        let state = repo.capture_state().unwrap();
        assert!(state.staged.contains("a.rs"));
        repo.discard(snapshot);
    }

    #[test]
    fn test_restore_is_idempotent() {
        let (temp, repo) = scratch_repo();
        fs::write(temp.path().join("a.rs"), "original\n").unwrap();
        git_in(temp.path(), &["add", "a.rs"]);

        let mut snapshot = repo.snapshot().unwrap();
        fs::write(temp.path().join("a.rs"), "clobbered\n").unwrap();

        repo.restore(&mut snapshot).unwrap();
        let first = fs::read_to_string(temp.path().join("a.rs")).unwrap();
        repo.restore(&mut snapshot).unwrap();
        let second = fs::read_to_string(temp.path().join("a.rs")).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, "original\n");
        repo.discard(snapshot);
    }

    #[test]
    fn test_snapshot_clean_tree_fails() {
        let (_temp, repo) = scratch_repo();
        let result = repo.snapshot();
        assert!(matches!(result, Err(Error::Snapshot { .. })));
    }

    #[test]
    fn test_snapshot_preserves_unstaged_work() {
        let (temp, repo) = scratch_repo();
        fs::write(temp.path().join("a.rs"), "staged\n").unwrap();
        git_in(temp.path(), &["add", "a.rs"]);
        fs::write(temp.path().join("README.md"), "# unstaged edit\n").unwrap();

        let mut snapshot = repo.snapshot().unwrap();
        fs::write(temp.path().join("a.rs"), "task output\n").unwrap();
        fs::write(temp.path().join("README.md"), "# clobbered\n").unwrap();

        repo.restore(&mut snapshot).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("README.md")).unwrap(),
            "# unstaged edit\n"
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("a.rs")).unwrap(),
            "staged\n"
        );
        repo.discard(snapshot);
    }

    #[test]
    fn test_discard_removes_stash_entry() {
        let (temp, repo) = scratch_repo();
        fs::write(temp.path().join("a.rs"), "staged\n").unwrap();
        git_in(temp.path(), &["add", "a.rs"]);

        let snapshot = repo.snapshot().unwrap();
        repo.discard(snapshot);

        let listing = repo.git_stdout(&["stash", "list"]).unwrap();
        assert!(listing.is_empty());
    }

    #[test]
    fn test_modified_among_and_add_batch_long_path_lists() {
        let (temp, repo) = scratch_repo();
        // Long names so the serialized argument list crosses the batching
        // threshold with a manageable file count.
        let names: Vec<String> = (0..400)
            .map(|i| format!("{}_{:03}.txt", "f".repeat(96), i))
            .collect();
        let total: usize = names.iter().map(|n| n.len() + 1).sum();
        assert!(total > GIT_ARG_LIMIT, "fixture must exceed one batch");

        for name in &names {
            fs::write(temp.path().join(name), "one\n").unwrap();
        }
        git_in(temp.path(), &["add", "."]);
        for name in &names {
            fs::write(temp.path().join(name), "two\n").unwrap();
        }

        let modified = repo.modified_among(&names).unwrap();
        assert_eq!(modified.len(), names.len());

        repo.add(&names).unwrap();
        let state = repo.capture_state().unwrap();
        assert!(state.unstaged.is_empty());
        assert_eq!(state.staged.len(), names.len());
    }

    #[test]
    fn test_modified_among() {
        let (temp, repo) = scratch_repo();
        fs::write(temp.path().join("a.rs"), "one\n").unwrap();
        fs::write(temp.path().join("b.rs"), "two\n").unwrap();
        git_in(temp.path(), &["add", "a.rs", "b.rs"]);

        // Only a.rs changes relative to the index.
        fs::write(temp.path().join("a.rs"), "one formatted\n").unwrap();

        let modified = repo
            .modified_among(&["a.rs".to_string(), "b.rs".to_string()])
            .unwrap();
        assert!(modified.contains("a.rs"));
        assert!(!modified.contains("b.rs"));
    }
}
