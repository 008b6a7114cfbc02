//! Immutable per-invocation configuration
//!
//! A [`RunContext`] is assembled once by the CLI layer from parsed flags and
//! platform defaults, then handed read-only to the orchestrator. Nothing in
//! the engine mutates it mid-run.

use std::path::PathBuf;

/// Concurrency cap for task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// Run every available chunk simultaneously.
    Unbounded,
    /// At most this many chunks execute at any instant. `Limited(1)` is
    /// strictly sequential execution.
    Limited(usize),
}

impl Concurrency {
    /// Worker-pool size for a given number of runnable chunks.
    pub fn pool_size(&self, chunk_count: usize) -> usize {
        match *self {
            Concurrency::Unbounded => chunk_count.max(1),
            Concurrency::Limited(n) => n.max(1).min(chunk_count.max(1)),
        }
    }
}

/// How task command lines are executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Split each command template into an argv once, then spawn directly.
    Direct,
    /// Pass the whole command line as one string to a shell. Per-argument
    /// escaping is bypassed; users are responsible for quoting.
    Shell(PathBuf),
}

/// Default maximum command-line length for the current platform.
///
/// The platform limits (macOS 262144, Windows 8191, elsewhere 131072) are
/// halved to leave headroom for the environment block, which counts against
/// the same kernel limit.
pub fn default_max_arg_length() -> usize {
    let platform_max = if cfg!(target_os = "macos") {
        262_144
    } else if cfg!(windows) {
        8_191
    } else {
        131_072
    };
    platform_max / 2
}

/// Immutable configuration for one run.
///
/// Created once at startup; read-only afterward.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Directory the run was started from; repository discovery begins here.
    pub cwd: PathBuf,
    /// Concurrency cap for chunk execution.
    pub concurrency: Concurrency,
    /// Maximum serialized command-line length before chunking kicks in.
    pub max_arg_length: usize,
    /// Keep the run successful even if tasks revert every staged change.
    pub allow_empty: bool,
    /// Pass repository-root-relative file paths to tasks instead of absolute.
    pub relative: bool,
    /// Create a backup stash before running and restore it on failure.
    pub backup: bool,
    /// Stop dispatching new chunks as soon as one fails.
    pub fail_fast: bool,
    /// Direct argv execution or opaque shell strings.
    pub shell: ShellMode,
    /// Show output of successful tasks, not just failed ones.
    pub verbose: bool,
}

impl RunContext {
    /// A context with defaults suitable for tests and library embedding.
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            concurrency: Concurrency::Unbounded,
            max_arg_length: default_max_arg_length(),
            allow_empty: false,
            relative: false,
            backup: true,
            fail_fast: false,
            shell: ShellMode::Direct,
            verbose: false,
        }
    }
}
