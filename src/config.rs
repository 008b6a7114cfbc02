//! # Task Configuration
//!
//! Loading and parsing of the task list: an ordered mapping from glob
//! pattern to one or more command templates.
//!
//! ```yaml
//! "*.rs": cargo fmt --
//! "*.js":
//!   - prettier --write
//!   - eslint --fix
//! ```
//!
//! Declaration order is significant — it drives the order task groups are
//! reported in — so the file is parsed through `serde_yaml::Mapping`, which
//! preserves insertion order, rather than a `HashMap`. JSON configs parse
//! through the same path since YAML is a superset.
//!
//! Discovery searches upward from the working directory for the first of
//! [`CONFIG_FILE_NAMES`], mirroring how git itself finds its repository root.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::{Error, Result};

/// Candidate configuration file names, in precedence order.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".stagehand.yaml",
    ".stagehand.yml",
    ".stagehand.json",
    "stagehand.config.yaml",
];

/// A glob pattern plus the command templates to run against matched paths.
///
/// Declared externally and treated as read-only input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Case-sensitive glob, matched against repository-relative paths.
    pub pattern: String,
    /// One or more command templates, run in declaration order.
    pub commands: Vec<String>,
}

impl TaskSpec {
    /// Short human-readable label used in reports and logs.
    pub fn label(&self) -> &str {
        &self.pattern
    }
}

/// Parse a configuration document into an ordered task list.
pub fn parse(content: &str) -> Result<Vec<TaskSpec>> {
    let value: Value = serde_yaml::from_str(content)?;

    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => {
            return Err(Error::ConfigParse {
                message: "configuration is empty".to_string(),
                hint: Some("add at least one `\"<glob>\": <command>` entry".to_string()),
            })
        }
        other => {
            return Err(Error::ConfigParse {
                message: format!("expected a mapping of glob patterns to commands, found {}", value_kind(&other)),
                hint: Some("the top level must look like `\"*.rs\": cargo fmt --`".to_string()),
            })
        }
    };

    let mut tasks = Vec::with_capacity(mapping.len());
    for (key, val) in mapping {
        let pattern = match key {
            Value::String(s) => s,
            other => {
                return Err(Error::ConfigParse {
                    message: format!("task pattern must be a string, found {}", value_kind(&other)),
                    hint: None,
                })
            }
        };

        // Validate the glob eagerly so a typo fails before anything runs.
        glob::Pattern::new(&pattern)?;

        let commands = parse_commands(&pattern, val)?;
        tasks.push(TaskSpec { pattern, commands });
    }

    if tasks.is_empty() {
        return Err(Error::ConfigParse {
            message: "configuration contains no tasks".to_string(),
            hint: Some("add at least one `\"<glob>\": <command>` entry".to_string()),
        });
    }

    Ok(tasks)
}

fn parse_commands(pattern: &str, value: Value) -> Result<Vec<String>> {
    match value {
        Value::String(cmd) if !cmd.trim().is_empty() => Ok(vec![cmd]),
        Value::Sequence(seq) if !seq.is_empty() => seq
            .into_iter()
            .map(|item| match item {
                Value::String(cmd) if !cmd.trim().is_empty() => Ok(cmd),
                other => Err(Error::ConfigParse {
                    message: format!(
                        "commands for `{}` must be non-empty strings, found {}",
                        pattern,
                        value_kind(&other)
                    ),
                    hint: None,
                }),
            })
            .collect(),
        other => Err(Error::ConfigParse {
            message: format!(
                "task `{}` must map to a command string or a list of commands, found {}",
                pattern,
                value_kind(&other)
            ),
            hint: None,
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(s) if s.trim().is_empty() => "an empty string",
        Value::String(_) => "a string",
        Value::Sequence(s) if s.is_empty() => "an empty list",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Parse a configuration file from disk.
pub fn from_file(path: &Path) -> Result<Vec<TaskSpec>> {
    let content = fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content)
}

/// Search upward from `start` for the nearest configuration file.
///
/// Returns the first match by directory depth, then by
/// [`CONFIG_FILE_NAMES`] precedence within a directory.
pub fn discover(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_FILE_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        dir = current.parent();
    }
    None
}
