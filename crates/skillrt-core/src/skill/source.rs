//! Skill sources feeding the registry.
//!
//! A source yields raw SKILL.md documents; the registry parses, validates,
//! and indexes them. Sources are scanned on a blocking thread, so `scan` is
//! synchronous.

use std::path::PathBuf;

use skillrt_types::error::SkillError;
use skillrt_types::skill::SkillKind;

/// One SKILL.md document found by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Opaque locator stored in the resulting `SkillDef`.
    pub location: String,
    pub root_dir: Option<PathBuf>,
    /// Directory the manifest was found in, for name mismatch warnings.
    pub dir_name: Option<String>,
    pub content: String,
}

/// A provider of skill manifests.
pub trait SkillSource: Send + Sync {
    /// Stable identifier used in refresh reports and logs.
    fn id(&self) -> &str;

    fn kind(&self) -> SkillKind;

    /// Enumerate every manifest currently available.
    ///
    /// An `Err` means the whole source is unavailable. Individual unreadable
    /// entries should be logged and skipped instead.
    fn scan(&self) -> Result<Vec<SourceEntry>, SkillError>;
}

/// Location prefix for embedded skills.
pub const EMBEDDED_SCHEME: &str = "embedded://";

/// Built-in skills compiled into the host binary.
///
/// Embedded skills have no root directory, so they carry instructions only.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    id: String,
    skills: Vec<(String, String)>,
}

impl EmbeddedSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            skills: Vec::new(),
        }
    }

    /// Register a skill under `name` with its full SKILL.md text.
    pub fn with_skill(mut self, name: impl Into<String>, skill_md: impl Into<String>) -> Self {
        self.skills.push((name.into(), skill_md.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl SkillSource for EmbeddedSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SkillKind {
        SkillKind::Embedded
    }

    fn scan(&self) -> Result<Vec<SourceEntry>, SkillError> {
        Ok(self
            .skills
            .iter()
            .map(|(name, content)| SourceEntry {
                location: format!("{EMBEDDED_SCHEME}{name}"),
                root_dir: None,
                dir_name: Some(name.clone()),
                content: content.clone(),
            })
            .collect())
    }
}
