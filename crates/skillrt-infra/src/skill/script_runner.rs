//! Local script runner.
//!
//! Implements [`ScriptRunner`] by spawning the interpreter on the host with
//! `tokio::process`. The child is killed when the call times out, is
//! cancelled, or its future is dropped.

use std::process::Stdio;
use std::time::Instant;

use skillrt_core::service::script::{ScriptInvocation, ScriptOutcome, ScriptRunner};
use skillrt_types::error::SkillError;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct LocalScriptRunner;

impl LocalScriptRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptRunner for LocalScriptRunner {
    async fn run(
        &self,
        invocation: ScriptInvocation,
        cancel: CancellationToken,
    ) -> Result<ScriptOutcome, SkillError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.program_args)
            .arg(&invocation.script)
            .args(&invocation.args)
            .envs(&invocation.env)
            .current_dir(&invocation.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let child = cmd.spawn().map_err(|e| SkillError::SpawnFailure {
            program: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        let timeout_ms = invocation.timeout.as_millis() as u64;
        let output = tokio::select! {
            result = tokio::time::timeout(invocation.timeout, child.wait_with_output()) => {
                match result {
                    Ok(output) => output?,
                    Err(_) => {
                        tracing::warn!(
                            script = %invocation.script.display(),
                            timeout_ms,
                            "Script timed out, killed"
                        );
                        return Err(SkillError::Timeout { timeout_ms });
                    }
                }
            }
            () = cancel.cancelled() => {
                tracing::info!(script = %invocation.script.display(), "Script cancelled, killed");
                return Err(SkillError::Cancelled);
            }
        };
        let duration = start.elapsed();

        let (stdout, truncated_stdout) = truncate_lossy(&output.stdout, invocation.max_output_bytes);
        let (stderr, truncated_stderr) = truncate_lossy(&output.stderr, invocation.max_output_bytes);

        tracing::debug!(
            script = %invocation.script.display(),
            exit_code = ?output.status.code(),
            duration_ms = duration.as_millis() as u64,
            "Script finished"
        );

        Ok(ScriptOutcome {
            exit_code: output.status.code(),
            stdout,
            stderr,
            duration,
            truncated_stdout,
            truncated_stderr,
        })
    }
}

fn truncate_lossy(bytes: &[u8], max: usize) -> (String, bool) {
    if bytes.len() <= max {
        return (String::from_utf8_lossy(bytes).into_owned(), false);
    }
    (String::from_utf8_lossy(&bytes[..max]).into_owned(), true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn invocation(dir: &Path, script: &str, body: &str) -> ScriptInvocation {
        let path = dir.join(script);
        std::fs::write(&path, body).unwrap();
        ScriptInvocation {
            program: "sh".to_owned(),
            program_args: Vec::new(),
            script: path,
            args: Vec::new(),
            env: BTreeMap::new(),
            workdir: dir.to_path_buf(),
            timeout: Duration::from_secs(10),
            max_output_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let tmp = TempDir::new().unwrap();
        let mut inv = invocation(
            tmp.path(),
            "run.sh",
            "echo \"hello $1 $GREETING\"\necho oops >&2\nexit 4\n",
        );
        inv.args = vec!["world".to_owned()];
        inv.env.insert("GREETING".to_owned(), "again".to_owned());

        let out = LocalScriptRunner::new()
            .run(inv, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.exit_code, Some(4));
        assert_eq!(out.stdout.trim(), "hello world again");
        assert_eq!(out.stderr.trim(), "oops");
        assert!(!out.truncated_stdout);
    }

    #[tokio::test]
    async fn runs_in_workdir() {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path().join("work");
        std::fs::create_dir(&work).unwrap();
        let mut inv = invocation(tmp.path(), "pwd.sh", "pwd\n");
        inv.workdir = work.clone();

        let out = LocalScriptRunner::new()
            .run(inv, CancellationToken::new())
            .await
            .unwrap();
        let reported = std::fs::canonicalize(out.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(&work).unwrap());
    }

    #[tokio::test]
    async fn truncates_long_output() {
        let tmp = TempDir::new().unwrap();
        let mut inv = invocation(tmp.path(), "loud.sh", "i=0\nwhile [ $i -lt 200 ]; do echo line; i=$((i+1)); done\n");
        inv.max_output_bytes = 16;

        let out = LocalScriptRunner::new()
            .run(inv, CancellationToken::new())
            .await
            .unwrap();
        assert!(out.truncated_stdout);
        assert_eq!(out.stdout.len(), 16);
        assert_eq!(out.exit_code, Some(0));
    }

    #[tokio::test]
    async fn times_out() {
        let tmp = TempDir::new().unwrap();
        let mut inv = invocation(tmp.path(), "slow.sh", "sleep 5\n");
        inv.timeout = Duration::from_millis(100);

        let started = Instant::now();
        let err = LocalScriptRunner::new()
            .run(inv, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, SkillError::Timeout { timeout_ms: 100 });
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn cancellation_stops_script() {
        let tmp = TempDir::new().unwrap();
        let inv = invocation(tmp.path(), "slow.sh", "sleep 5\n");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = LocalScriptRunner::new().run(inv, cancel).await.unwrap_err();
        assert_eq!(err, SkillError::Cancelled);
    }

    #[tokio::test]
    async fn missing_interpreter_is_spawn_failure() {
        let tmp = TempDir::new().unwrap();
        let mut inv = invocation(tmp.path(), "x.sh", "true\n");
        inv.program = "skillrt-no-such-interpreter".to_owned();

        let err = LocalScriptRunner::new()
            .run(inv, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::SpawnFailure { ref program, .. } if program == "skillrt-no-such-interpreter"));
    }

    #[test]
    fn truncate_lossy_keeps_short_input() {
        assert_eq!(truncate_lossy(b"abc", 10), ("abc".to_owned(), false));
        assert_eq!(truncate_lossy(b"abcdef", 3), ("abc".to_owned(), true));
    }
}
