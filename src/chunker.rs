//! # Argument Chunking
//!
//! Splits an oversized file list into multiple invocations of the same
//! command template so no single invocation exceeds the platform's
//! command-line length limit.
//!
//! The split is greedy and order-stable: paths accumulate into the current
//! chunk while the running serialized length stays at or under the limit,
//! then a new chunk starts. Stability matters because some tasks (formatters
//! in particular) produce order-sensitive output.
//!
//! A single path that alone exceeds the limit still gets its own one-path
//! chunk rather than being dropped; the chunk is flagged so callers can warn.
//! The eventual spawn may still fail, which is reported at execution time.
//!
//! Escaping rules are resolved here, once: a [`TaskChunk`] carries either a
//! pre-split argv or an opaque shell string, so execution never re-parses
//! command text.

use std::path::{Path, PathBuf};

use crate::config::TaskSpec;
use crate::context::{RunContext, ShellMode};
use crate::error::{Error, Result};
use crate::matcher::TaskGroup;

/// How a chunk is executed: structured argv or opaque shell string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Program plus arguments, spawned directly. File paths were appended as
    /// individual arguments; no shell is involved.
    Argv(Vec<String>),
    /// A full command line handed to `shell -c`. Per-argument escaping is
    /// bypassed; quoting is the config author's responsibility.
    Shell { shell: PathBuf, command_line: String },
}

/// One executable invocation: a command template bound to a bounded sub-list
/// of paths. Independently runnable and independently attributable to its
/// parent group for reporting.
#[derive(Debug, Clone)]
pub struct TaskChunk {
    /// Index of the parent group in declaration order.
    pub group_index: usize,
    /// Position of this chunk within the group's chunks for one template.
    pub chunk_index: usize,
    /// Total chunks produced for this (group, template) pair.
    pub chunk_count: usize,
    /// Group label plus chunk position when split, e.g. `*.rs [2/3]`.
    pub label: String,
    /// The original command template, for reporting.
    pub command: String,
    /// The file arguments passed to this invocation.
    pub files: Vec<String>,
    /// Resolved execution form.
    pub invocation: Invocation,
    /// A lone path exceeded the length limit; surfaced as a warning.
    pub oversized: bool,
}

/// Greedily split `files` so that `template` plus the accumulated paths,
/// separators included, never serializes longer than `max_length`.
///
/// Exception: a single path whose own contribution exceeds the limit forms
/// its own chunk. Returns `(chunk, oversized)` pairs in stable input order.
pub fn chunk(template: &str, files: &[String], max_length: usize) -> Vec<(Vec<String>, bool)> {
    let base = template.len();
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = base;

    for file in files {
        let contribution = file.len() + 1;
        if !current.is_empty() && current_len + contribution > max_length {
            chunks.push((std::mem::take(&mut current), false));
            current_len = base;
        }
        current_len += contribution;
        current.push(file.clone());
        if current.len() == 1 && current_len > max_length {
            // Oversized lone path: emit it anyway and let the spawn decide.
            chunks.push((std::mem::take(&mut current), true));
            current_len = base;
        }
    }

    if !current.is_empty() {
        chunks.push((current, false));
    }

    chunks
}

/// Build all executable chunks for one group, in template declaration order.
///
/// File paths are resolved here — absolute by default, repository-relative
/// when the context asks for relative paths — and the invocation form is
/// fixed according to the shell mode. Matched paths are relative to
/// `repo_root`, which may be an ancestor of the directory the run was
/// started from, so absolute resolution joins against the root.
pub fn chunk_group(
    group: &TaskGroup,
    group_index: usize,
    ctx: &RunContext,
    repo_root: &Path,
) -> Result<Vec<TaskChunk>> {
    let file_args = resolve_file_args(group, ctx, repo_root);
    let mut out = Vec::new();

    for template in &group.spec.commands {
        let pieces = chunk(template, &file_args, ctx.max_arg_length);
        let chunk_count = pieces.len();

        for (chunk_index, (files, oversized)) in pieces.into_iter().enumerate() {
            let invocation = build_invocation(&group.spec, template, &files, ctx)?;
            let label = if chunk_count > 1 {
                format!("{} [{}/{}]", group.label(), chunk_index + 1, chunk_count)
            } else {
                group.label().to_string()
            };
            out.push(TaskChunk {
                group_index,
                chunk_index,
                chunk_count,
                label,
                command: template.clone(),
                files,
                invocation,
                oversized,
            });
        }
    }

    Ok(out)
}

fn resolve_file_args(group: &TaskGroup, ctx: &RunContext, repo_root: &Path) -> Vec<String> {
    if ctx.relative {
        group.files.clone()
    } else {
        group
            .files
            .iter()
            .map(|f| repo_root.join(f).to_string_lossy().into_owned())
            .collect()
    }
}

fn build_invocation(
    spec: &TaskSpec,
    template: &str,
    files: &[String],
    ctx: &RunContext,
) -> Result<Invocation> {
    match &ctx.shell {
        ShellMode::Direct => {
            let mut argv = shell_words::split(template).map_err(|e| Error::CommandParse {
                command: template.to_string(),
                message: e.to_string(),
            })?;
            if argv.is_empty() {
                return Err(Error::CommandParse {
                    command: template.to_string(),
                    message: format!("task `{}` resolves to an empty command", spec.pattern),
                });
            }
            argv.extend(files.iter().cloned());
            Ok(Invocation::Argv(argv))
        }
        ShellMode::Shell(shell) => {
            let mut command_line = String::with_capacity(template.len());
            command_line.push_str(template);
            for file in files {
                command_line.push(' ');
                command_line.push_str(file);
            }
            Ok(Invocation::Shell {
                shell: shell.clone(),
                command_line,
            })
        }
    }
}
