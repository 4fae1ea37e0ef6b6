//! Filesystem adapter for skillrt.
//!
//! Implements the `FileSystem` trait from `skillrt-core` for real filesystem
//! I/O and resolves the data directory.

use std::path::{Path, PathBuf};

use skillrt_core::service::fs::{FileContents, FileSystem};
use tokio::io::AsyncReadExt;

/// Local filesystem implementation of the `FileSystem` trait.
///
/// All operations go through `tokio::fs` for async I/O.
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for LocalFileSystem {
    async fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error> {
        tokio::fs::canonicalize(path).await
    }

    async fn read_prefix(&self, path: &Path, limit: usize) -> Result<FileContents, std::io::Error> {
        let file = tokio::fs::File::open(path).await?;
        let total_len = file.metadata().await?.len();

        let mut bytes = Vec::with_capacity(limit.min(total_len as usize));
        file.take(limit as u64).read_to_end(&mut bytes).await?;
        Ok(FileContents { bytes, total_len })
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `SKILLRT_DATA_DIR` environment variable
/// 2. `~/.skillrt`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SKILLRT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".skillrt");
    }

    // Last resort: current directory
    PathBuf::from(".skillrt")
}
