//! # Task Matching
//!
//! Binds each configured [`TaskSpec`] to the staged paths its glob pattern
//! matches. Matching is pure: it only looks at the path strings already
//! captured in the [`StagedFileSet`], never at the filesystem.
//!
//! Patterns without a directory separator match against the file name alone,
//! so `*.rs` catches `src/lib.rs` the way users expect; patterns containing
//! `/` match against the whole repository-relative path. Matching is
//! case-sensitive and deterministic: groups come back in spec declaration
//! order, files in sorted path order.

use glob::{MatchOptions, Pattern};

use crate::config::TaskSpec;
use crate::error::Result;
use crate::repo::StagedFileSet;

/// A [`TaskSpec`] bound to the concrete staged paths it matched for this run.
#[derive(Debug, Clone)]
pub struct TaskGroup {
    pub spec: TaskSpec,
    /// Repository-relative matched paths, sorted.
    pub files: Vec<String>,
}

impl TaskGroup {
    /// Short label for reports, e.g. `*.rs`.
    pub fn label(&self) -> &str {
        self.spec.label()
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Map staged paths to task groups, preserving spec declaration order.
///
/// Specs that match nothing produce no group; a task with no matching files
/// never runs. Paths matching no spec are simply excluded.
pub fn match_tasks(state: &StagedFileSet, specs: &[TaskSpec]) -> Result<Vec<TaskGroup>> {
    let mut groups = Vec::new();

    for spec in specs {
        let pattern = Pattern::new(&spec.pattern)?;
        let match_base = !spec.pattern.contains('/');

        let files: Vec<String> = state
            .staged
            .iter()
            .filter(|path| {
                let candidate = if match_base {
                    path.rsplit('/').next().unwrap_or(path)
                } else {
                    path.as_str()
                };
                pattern.matches_with(candidate, MATCH_OPTIONS)
            })
            .cloned()
            .collect();

        if !files.is_empty() {
            groups.push(TaskGroup {
                spec: spec.clone(),
                files,
            });
        }
    }

    Ok(groups)
}
