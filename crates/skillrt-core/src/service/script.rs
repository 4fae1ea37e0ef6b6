//! ScriptRunner trait for spawning skill scripts.
//!
//! The dispatcher validates paths, picks the interpreter, and clamps the
//! timeout; the runner only spawns and collects. The `LocalScriptRunner`
//! adapter lives in skillrt-infra.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use skillrt_types::error::SkillError;
use tokio_util::sync::CancellationToken;

/// A fully validated script invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    /// Interpreter program, looked up on `PATH`.
    pub program: String,
    /// Extra interpreter arguments placed before the script path.
    pub program_args: Vec<String>,
    pub script: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub workdir: PathBuf,
    pub timeout: Duration,
    /// Per-stream cap on captured output.
    pub max_output_bytes: usize,
}

/// What a finished script produced.
///
/// A non-zero exit code is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub truncated_stdout: bool,
    pub truncated_stderr: bool,
}

/// Abstraction over process spawning.
///
/// Implementations must return `Timeout` when `invocation.timeout` elapses,
/// `Cancelled` when `cancel` fires, and `SpawnFailure` when the interpreter
/// cannot be started. The child process must not outlive the call.
pub trait ScriptRunner: Send + Sync {
    fn run(
        &self,
        invocation: ScriptInvocation,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = Result<ScriptOutcome, SkillError>> + Send;
}
