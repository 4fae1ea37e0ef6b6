//! Runtime configuration loader for skillrt.
//!
//! Reads `config.toml` from the data directory (`~/.skillrt/` in production)
//! and deserializes it into [`RuntimeConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::{Path, PathBuf};

use skillrt_types::config::RuntimeConfig;

/// Load runtime configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`RuntimeConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
pub async fn load_runtime_config(data_dir: &Path) -> RuntimeConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return RuntimeConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RuntimeConfig::default();
        }
    };

    match toml::from_str::<RuntimeConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RuntimeConfig::default()
        }
    }
}

/// The skill roots to scan, in registration order.
///
/// An empty `skill_roots` means `{data_dir}/skills`. Relative roots are
/// taken relative to the data directory.
pub fn effective_skill_roots(config: &RuntimeConfig, data_dir: &Path) -> Vec<PathBuf> {
    if config.skill_roots.is_empty() {
        return vec![data_dir.join("skills")];
    }
    config
        .skill_roots
        .iter()
        .map(|root| {
            if root.is_absolute() {
                root.clone()
            } else {
                data_dir.join(root)
            }
        })
        .collect()
}
