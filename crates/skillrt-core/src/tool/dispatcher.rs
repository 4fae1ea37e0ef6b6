//! Tool dispatch: validates a [`ToolCall`], runs it against a session, and
//! turns any failure into a structured [`ToolFailure`] for the model.
//!
//! `read` and `run_script` act on one active skill: the one named by the
//! `skill` argument, or the most recently loaded. Every path the model
//! supplies is checked lexically first and again after canonicalisation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use skillrt_types::config::RuntimeConfig;
use skillrt_types::error::SkillError;
use skillrt_types::skill::{SkillRecord, SCRIPTS_DIR};
use skillrt_types::tool::{
    ActiveSkill, ActiveSkillsOutput, ContentEncoding, ReadArgs, ReadOutput, RunScriptArgs,
    RunScriptOutput, ToolFailure,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::service::fs::FileSystem;
use crate::service::script::{ScriptInvocation, ScriptRunner};
use crate::session::{SessionManager, UnloadTarget};
use crate::tool::call::ToolCall;
use crate::tool::interpreter::InterpreterTable;
use crate::tool::path::{ensure_within, resolve_under_root};

/// Size and time bounds applied to tool calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLimits {
    pub max_read_bytes: usize,
    pub max_output_bytes: usize,
    pub script_timeout: Duration,
}

impl ToolLimits {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            max_read_bytes: config.max_read_bytes,
            max_output_bytes: config.max_output_bytes,
            script_timeout: config.script_timeout(),
        }
    }
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

pub struct ToolDispatcher<F: FileSystem, X: ScriptRunner> {
    sessions: Arc<SessionManager>,
    fs: F,
    runner: X,
    interpreters: InterpreterTable,
    limits: ToolLimits,
    shutdown: CancellationToken,
}

impl<F: FileSystem, X: ScriptRunner> ToolDispatcher<F, X> {
    pub fn new(sessions: Arc<SessionManager>, fs: F, runner: X) -> Self {
        Self {
            sessions,
            fs,
            runner,
            interpreters: InterpreterTable::default(),
            limits: ToolLimits::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interpreters(mut self, interpreters: InterpreterTable) -> Self {
        self.interpreters = interpreters;
        self
    }

    pub fn with_limits(mut self, limits: ToolLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Cancelling this token aborts every in-flight script.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Parse and dispatch a call given by wire name and JSON arguments.
    pub async fn dispatch_named(
        &self,
        session_id: Uuid,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolFailure> {
        let call = ToolCall::parse(name, args).map_err(|e| {
            tracing::warn!(session_id = %session_id, tool = %name, error = %e, "Rejected tool call");
            ToolFailure::from(e)
        })?;
        self.dispatch(session_id, call).await
    }

    /// Execute a validated call. Failures never abort the session.
    pub async fn dispatch(
        &self,
        session_id: Uuid,
        call: ToolCall,
    ) -> Result<serde_json::Value, ToolFailure> {
        let tool = call.kind();
        let started = Instant::now();

        let result = match call {
            ToolCall::Load(args) => self
                .sessions
                .load(session_id, &args.names, args.mode)
                .await
                .and_then(|records| to_json(&active_output(&records))),
            ToolCall::Unload(args) => {
                let target = if args.all {
                    UnloadTarget::All
                } else {
                    UnloadTarget::Names(args.names.unwrap_or_default())
                };
                self.sessions
                    .unload(session_id, target)
                    .await
                    .and_then(|records| to_json(&active_output(&records)))
            }
            ToolCall::Read(args) => match self.read(session_id, args).await {
                Ok(out) => to_json(&out),
                Err(e) => Err(e),
            },
            ToolCall::RunScript(args) => match self.run_script(session_id, args).await {
                Ok(out) => to_json(&out),
                Err(e) => Err(e),
            },
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(value) => {
                tracing::info!(session_id = %session_id, %tool, elapsed_ms, "Tool call completed");
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    %tool,
                    code = e.code(),
                    error = %e,
                    elapsed_ms,
                    "Tool call failed"
                );
                Err(ToolFailure::from(e))
            }
        }
    }

    /// `skills.read`: return a file from the target skill's root.
    pub async fn read(&self, session_id: Uuid, args: ReadArgs) -> Result<ReadOutput, SkillError> {
        let record = self.target_skill(session_id, args.skill.as_deref()).await?;
        let root = skill_root(&record)?;

        let candidate = resolve_under_root(root, &args.path)?;
        let resolved = self.contained_existing(root, &candidate, &args.path).await?;
        if self.fs.is_dir(&resolved).await {
            return Err(SkillError::InvalidArgument(format!(
                "'{}' is a directory",
                args.path
            )));
        }

        let contents = self
            .fs
            .read_prefix(&resolved, self.limits.max_read_bytes)
            .await
            .map_err(|e| map_io(e, &args.path))?;
        let truncated = contents.truncated();

        let (encoding, content) = match decode_text(&contents.bytes, truncated) {
            Some(text) => (ContentEncoding::Utf8, text),
            None => (ContentEncoding::Base64, STANDARD.encode(&contents.bytes)),
        };

        Ok(ReadOutput {
            skill: record.def.name.clone(),
            path: args.path,
            encoding,
            content,
            bytes: contents.total_len,
            truncated,
        })
    }

    /// `skills.run_script`: run a script from the target skill's `scripts/`.
    pub async fn run_script(
        &self,
        session_id: Uuid,
        args: RunScriptArgs,
    ) -> Result<RunScriptOutput, SkillError> {
        let record = self.target_skill(session_id, args.skill.as_deref()).await?;
        let root = skill_root(&record)?;
        let scripts_root = root.join(SCRIPTS_DIR);

        let candidate = resolve_under_root(root, &args.path)?;
        ensure_within(&scripts_root, &candidate, &args.path)?;
        let (program, program_args) = self.interpreters.resolve(&candidate)?;
        let script = self
            .contained_existing(&scripts_root, &candidate, &args.path)
            .await?;

        let workdir = match args.workdir.as_deref() {
            Some(raw) => {
                let dir = resolve_under_root(root, raw)?;
                let dir = self.contained_existing(root, &dir, raw).await?;
                if !self.fs.is_dir(&dir).await {
                    return Err(SkillError::InvalidArgument(format!(
                        "workdir '{raw}' is not a directory"
                    )));
                }
                dir
            }
            None => self.canonical_root(root, ".").await?,
        };

        let timeout = args
            .timeout_ms
            .map(Duration::from_millis)
            .map_or(self.limits.script_timeout, |t| t.min(self.limits.script_timeout));

        tracing::debug!(
            session_id = %session_id,
            skill = %record.def.name,
            script = %script.display(),
            %program,
            timeout_ms = timeout.as_millis() as u64,
            "Running skill script"
        );

        let outcome = self
            .runner
            .run(
                ScriptInvocation {
                    program,
                    program_args,
                    script,
                    args: args.args,
                    env: args.env,
                    workdir,
                    timeout,
                    max_output_bytes: self.limits.max_output_bytes,
                },
                self.shutdown.child_token(),
            )
            .await?;

        Ok(RunScriptOutput {
            skill: record.def.name.clone(),
            path: args.path,
            exit_code: outcome.exit_code,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            duration_ms: outcome.duration.as_millis() as u64,
            truncated_stdout: outcome.truncated_stdout,
            truncated_stderr: outcome.truncated_stderr,
        })
    }

    /// The skill a read or run acts on.
    ///
    /// An explicit `skill` must name an active skill. Without one, the last
    /// skill in active order is used.
    async fn target_skill(
        &self,
        session_id: Uuid,
        skill: Option<&str>,
    ) -> Result<Arc<SkillRecord>, SkillError> {
        let active = self.sessions.active_records(session_id).await?;
        if active.is_empty() {
            return Err(SkillError::NoActiveSkill);
        }

        match skill {
            Some(reference) => active
                .iter()
                .find(|r| r.def.matches_reference(reference))
                .cloned()
                .ok_or_else(|| SkillError::SkillNotActive {
                    name: reference.to_owned(),
                }),
            None => active.last().cloned().ok_or(SkillError::NoActiveSkill),
        }
    }

    async fn canonical_root(&self, root: &Path, raw: &str) -> Result<PathBuf, SkillError> {
        self.fs
            .canonicalize(root)
            .await
            .map_err(|e| map_io(e, raw))
    }

    /// Canonicalise `candidate` and require it to stay under `root`.
    async fn contained_existing(
        &self,
        root: &Path,
        candidate: &Path,
        raw: &str,
    ) -> Result<PathBuf, SkillError> {
        let canonical_root = self.canonical_root(root, raw).await?;
        let canonical = self
            .fs
            .canonicalize(candidate)
            .await
            .map_err(|e| map_io(e, raw))?;
        ensure_within(&canonical_root, &canonical, raw)?;
        Ok(canonical)
    }
}

fn skill_root(record: &SkillRecord) -> Result<&Path, SkillError> {
    record
        .root_dir
        .as_deref()
        .ok_or_else(|| SkillError::NoResources {
            name: record.def.name.clone(),
        })
}

fn active_output(records: &[Arc<SkillRecord>]) -> ActiveSkillsOutput {
    ActiveSkillsOutput {
        active_skills: records.iter().map(|r| ActiveSkill::from(r.as_ref())).collect(),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, SkillError> {
    serde_json::to_value(value).map_err(|e| SkillError::Io(format!("serialize tool output: {e}")))
}

fn map_io(err: std::io::Error, raw: &str) -> SkillError {
    if err.kind() == std::io::ErrorKind::NotFound {
        SkillError::FileNotFound {
            path: raw.to_owned(),
        }
    } else {
        SkillError::from(err)
    }
}

/// UTF-8 text without NUL bytes, or `None` for binary content.
///
/// A multi-byte character cut by truncation is dropped rather than treated
/// as binary.
fn decode_text(bytes: &[u8], truncated: bool) -> Option<String> {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) if truncated && e.error_len().is_none() => {
            std::str::from_utf8(&bytes[..e.valid_up_to()]).ok()?
        }
        Err(_) => return None,
    };
    if text.contains('\0') {
        return None;
    }
    Some(text.to_owned())
}
