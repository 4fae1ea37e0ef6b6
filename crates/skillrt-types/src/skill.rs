//! Skill system domain types.
//!
//! Defines the natural key of a skill ([`SkillDef`]), the parsed SKILL.md
//! manifest, the indexed [`SkillRecord`] served by the registry, and the
//! filters used to scope listings.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

/// How a skill is sourced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    /// A directory on disk containing `SKILL.md` plus optional resources.
    Filesystem,
    /// A built-in skill compiled into the host. Has no resources or scripts.
    Embedded,
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem => write!(f, "filesystem"),
            Self::Embedded => write!(f, "embedded"),
        }
    }
}

impl FromStr for SkillKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filesystem" | "fs" => Ok(Self::Filesystem),
            "embedded" | "builtin" => Ok(Self::Embedded),
            other => Err(format!("unknown skill type '{other}'")),
        }
    }
}

/// How `skills.load` combines the requested names with the active list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// The active list becomes exactly the requested names.
    #[default]
    Replace,
    /// Requested names are appended when not already active.
    Add,
}

// ---------------------------------------------------------------------------
// Skill definition (natural key)
// ---------------------------------------------------------------------------

/// The natural key of a skill: `{type, name, location}`.
///
/// Immutable once created. `location` is opaque to everything except the
/// source that produced it (an absolute SKILL.md path for filesystem skills).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkillDef {
    #[serde(rename = "type")]
    pub kind: SkillKind,
    pub name: String,
    pub location: String,
}

impl SkillDef {
    pub fn new(kind: SkillKind, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            location: location.into(),
        }
    }

    /// Whether a user-supplied reference (`name` or `type:name`) names this skill.
    pub fn matches_reference(&self, reference: &str) -> bool {
        match reference.split_once(':') {
            Some((kind, name)) => {
                kind.parse::<SkillKind>().is_ok_and(|k| k == self.kind) && name == self.name
            }
            None => reference == self.name,
        }
    }
}

impl fmt::Display for SkillDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

// ---------------------------------------------------------------------------
// Manifest types (agentskills.io compatible)
// ---------------------------------------------------------------------------

/// Parsed SKILL.md YAML frontmatter.
///
/// Only `name` and `description` are required. Unknown keys are kept in the
/// record's free-form `properties`, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillManifest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub compatibility: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "allowed-tools")]
    pub allowed_tools: Option<String>,
    /// Administratively disabled: listed and resolvable, but not loadable.
    #[serde(default)]
    pub disabled: bool,
}

// ---------------------------------------------------------------------------
// Indexed record
// ---------------------------------------------------------------------------

/// An indexed skill as served by the registry snapshot.
///
/// Records are never mutated after construction; a refresh replaces them
/// wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRecord {
    pub def: SkillDef,
    pub description: String,
    /// Skill root directory. `None` for embedded skills.
    pub root_dir: Option<PathBuf>,
    /// Every frontmatter key, as JSON values.
    pub properties: BTreeMap<String, serde_json::Value>,
    /// The markdown body below the frontmatter.
    pub instructions: String,
    /// Lowercase hex SHA-256 of `instructions`.
    pub digest: String,
    pub enabled: bool,
}

impl SkillRecord {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// The directory scripts must live under, if the skill has a root.
    pub fn scripts_dir(&self) -> Option<PathBuf> {
        self.root_dir.as_deref().map(|root| root.join(SCRIPTS_DIR))
    }
}

/// Name of the sub-directory that `skills.run_script` is confined to.
pub const SCRIPTS_DIR: &str = "scripts";

/// Name of the manifest file inside a filesystem skill directory.
pub const MANIFEST_FILE: &str = "SKILL.md";

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Filter applied to registry listings.
///
/// All populated criteria must match. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<BTreeSet<SkillKind>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_prefix: Option<String>,
    /// Explicit allow-list of visible skills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<BTreeSet<SkillDef>>,
}

impl SkillFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: SkillKind) -> Self {
        self.kinds.get_or_insert_with(BTreeSet::new).insert(kind);
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    pub fn with_location_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.location_prefix = Some(prefix.into());
        self
    }

    pub fn with_allowed(mut self, defs: impl IntoIterator<Item = SkillDef>) -> Self {
        self.allow.get_or_insert_with(BTreeSet::new).extend(defs);
        self
    }

    pub fn matches(&self, def: &SkillDef) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&def.kind) {
                return false;
            }
        }
        if let Some(prefix) = &self.name_prefix {
            if !def.name.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(prefix) = &self.location_prefix {
            if !def.location.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(allow) = &self.allow {
            if !allow.contains(def) {
                return false;
            }
        }
        true
    }
}

/// Render a filesystem path as a record location.
pub fn location_for_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
