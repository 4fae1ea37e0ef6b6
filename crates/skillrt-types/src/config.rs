//! Runtime configuration types for skillrt.
//!
//! `RuntimeConfig` represents the `config.toml` in the data directory that
//! controls skill roots, session capacity, presence staleness, and the
//! limits applied to tool calls.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level runtime configuration.
///
/// Loaded from `~/.skillrt/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directories scanned for `*/SKILL.md`, in registration order.
    /// Empty means `{data_dir}/skills`.
    #[serde(default)]
    pub skill_roots: Vec<PathBuf>,

    /// Skill names that are indexed but may not be loaded.
    #[serde(default)]
    pub disabled_skills: Vec<String>,

    /// Default cap on active skills for sessions created without one.
    #[serde(default = "default_max_active_per_session")]
    pub max_active_per_session: usize,

    /// Age after which the presence tracker revalidates the registry.
    #[serde(default = "default_presence_max_age_secs")]
    pub presence_max_age_secs: u64,

    /// Upper bound for `skills.run_script`.
    #[serde(default = "default_script_timeout_secs")]
    pub script_timeout_secs: u64,

    /// Maximum bytes returned by `skills.read`.
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: usize,

    /// Maximum bytes kept from each of stdout and stderr.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Extension to interpreter overrides, merged over the built-in table.
    #[serde(default)]
    pub interpreters: BTreeMap<String, String>,
}

fn default_max_active_per_session() -> usize {
    8
}

fn default_presence_max_age_secs() -> u64 {
    300
}

fn default_script_timeout_secs() -> u64 {
    60
}

fn default_max_read_bytes() -> usize {
    256 * 1024
}

fn default_max_output_bytes() -> usize {
    32 * 1024
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            skill_roots: Vec::new(),
            disabled_skills: Vec::new(),
            max_active_per_session: default_max_active_per_session(),
            presence_max_age_secs: default_presence_max_age_secs(),
            script_timeout_secs: default_script_timeout_secs(),
            max_read_bytes: default_max_read_bytes(),
            max_output_bytes: default_max_output_bytes(),
            interpreters: BTreeMap::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn presence_max_age(&self) -> Duration {
        Duration::from_secs(self.presence_max_age_secs)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled_skills.iter().any(|d| d == name)
    }
}
