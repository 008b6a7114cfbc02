//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a scratch-git-repository fixture and helper
//! functions to reduce duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then:
//!
//! ```rust,ignore
//! mod common;
//! use common::GitFixture;
//!
//! #[test]
//! fn test_example() {
//!     let repo = GitFixture::new().with_config(r#""*.rs": true"#);
//!     repo.stage("a.rs", "fn a() {}\n");
//!     // ... test code
//! }
//! ```

use std::path::Path;
use std::process::Command;

use assert_fs::prelude::*;

/// Common configuration snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// A task that always succeeds without touching its files.
    pub const PASSING: &str = r#""*.txt": "true""#;

    /// A task that always fails.
    pub const FAILING: &str = r#""*.txt": "false""#;

    /// Appends a marker line to every matched file. The trailing `sh`
    /// becomes `$0` so the appended file paths land in `$@`.
    pub const APPENDING: &str =
        r#""*.txt": "sh -c 'for f; do echo marked >> \"$f\"; done' sh""#;
}

/// A temporary git repository with an initial commit, plus helpers for
/// staging files and running the stagehand binary inside it.
pub struct GitFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl GitFixture {
    /// Create a repository with one committed `README.md`.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        let fixture = Self { temp_dir };
        fixture.git(&["init", "--initial-branch=main"]);
        fixture.git(&["config", "user.email", "test@example.com"]);
        fixture.git(&["config", "user.name", "Test"]);
        fixture.write("README.md", "# fixture\n");
        fixture.git(&["add", "README.md"]);
        fixture.git(&["commit", "-m", "init"]);
        fixture
    }

    /// Run a git command in the fixture, asserting success.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("Failed to execute git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Write a `.stagehand.yaml` configuration file.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(".stagehand.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Write a file without staging it.
    pub fn write(&self, path: &str, content: &str) {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
    }

    /// Write a file and stage it.
    pub fn stage(&self, path: &str, content: &str) {
        self.write(path, content);
        self.git(&["add", path]);
    }

    /// Read a file back.
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    /// Currently staged paths.
    pub fn staged_files(&self) -> Vec<String> {
        self.git(&["diff", "--name-only", "--staged"])
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Stash entries currently stored.
    pub fn stash_count(&self) -> usize {
        self.git(&["stash", "list"]).lines().count()
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a command configured to run the binary in this fixture.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stagehand");
        cmd.current_dir(self.path());
        cmd
    }
}

impl Default for GitFixture {
    fn default() -> Self {
        Self::new()
    }
}
