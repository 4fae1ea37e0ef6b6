//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Core components are generic over filesystem/process traits; AppState pins
//! them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use skillrt_core::presence::{PresenceBook, PresenceTracker};
use skillrt_core::prompt::PromptComposer;
use skillrt_core::session::SessionManager;
use skillrt_core::skill::registry::SkillRegistry;
use skillrt_core::skill::source::{EmbeddedSource, SkillSource};
use skillrt_core::tool::{InterpreterTable, ToolDispatcher, ToolLimits};
use skillrt_infra::config::{effective_skill_roots, load_runtime_config};
use skillrt_infra::crypto::hash::Sha256ContentHasher;
use skillrt_infra::filesystem::{resolve_data_dir, LocalFileSystem};
use skillrt_infra::skill::{FsSkillSource, LocalScriptRunner};
use skillrt_types::config::RuntimeConfig;
use tokio_util::sync::CancellationToken;

/// Concrete dispatcher pinned to local I/O.
pub type ConcreteDispatcher = ToolDispatcher<LocalFileSystem, LocalScriptRunner>;

const BUILTIN_SKILL_AUTHORING: &str = include_str!("../builtin/skill-authoring/SKILL.md");

/// Skills shipped inside the binary.
pub fn builtin_source() -> EmbeddedSource {
    EmbeddedSource::new("builtin").with_skill("skill-authoring", BUILTIN_SKILL_AUTHORING)
}

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RuntimeConfig>,
    pub data_dir: PathBuf,
    pub registry: Arc<SkillRegistry>,
    pub presence_book: Arc<PresenceBook>,
    pub presence: PresenceTracker,
    pub sessions: Arc<SessionManager>,
    pub dispatcher: Arc<ConcreteDispatcher>,
    pub prompts: Arc<PromptComposer>,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Initialize from the data directory: load config, wire services, and
    /// run the first registry scan.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_runtime_config(&data_dir).await;
        let builtin: Arc<dyn SkillSource> = Arc::new(builtin_source());
        Ok(Self::build(data_dir, config, vec![builtin]).await)
    }

    /// Wire services for `config`. Filesystem roots come first, then `extra`
    /// sources in the given order.
    pub async fn build(
        data_dir: PathBuf,
        config: RuntimeConfig,
        extra: Vec<Arc<dyn SkillSource>>,
    ) -> Self {
        let mut sources: Vec<Arc<dyn SkillSource>> = effective_skill_roots(&config, &data_dir)
            .into_iter()
            .map(|root| Arc::new(FsSkillSource::new(root)) as Arc<dyn SkillSource>)
            .collect();
        sources.extend(extra);

        let registry = Arc::new(
            SkillRegistry::new(sources, Box::new(Sha256ContentHasher::new()))
                .with_disabled(config.disabled_skills.iter().cloned()),
        );

        let presence_book = Arc::new(PresenceBook::new());
        let presence = PresenceTracker::for_registry(
            Arc::clone(&registry),
            Arc::clone(&presence_book),
            config.presence_max_age(),
        );
        if let Err(e) = presence.force().await {
            tracing::warn!(error = %e, "Initial skill scan failed");
        }

        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&registry),
            config.max_active_per_session,
        ));

        let shutdown = CancellationToken::new();
        let dispatcher = ToolDispatcher::new(
            Arc::clone(&sessions),
            LocalFileSystem::new(),
            LocalScriptRunner::new(),
        )
        .with_interpreters(InterpreterTable::with_overrides(&config.interpreters))
        .with_limits(ToolLimits::from_config(&config))
        .with_shutdown(shutdown.clone());

        let prompts = Arc::new(PromptComposer::new(Arc::clone(&sessions)));

        tracing::debug!(
            sources = registry.source_ids().len(),
            skills = registry.snapshot().len(),
            "Application state ready"
        );

        Self {
            config: Arc::new(config),
            data_dir,
            registry,
            presence_book,
            presence,
            sessions,
            dispatcher: Arc::new(dispatcher),
            prompts,
            shutdown,
        }
    }

    /// Cancel in-flight scripts and stop background refreshes.
    pub async fn close(&self) {
        self.shutdown.cancel();
        self.presence.close().await;
    }
}
