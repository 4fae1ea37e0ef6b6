//! FileSystem trait for abstracting skill resource reads.
//!
//! Defined in skillrt-core so the tool dispatcher can read skill files
//! without depending on any specific filesystem implementation. The
//! `LocalFileSystem` adapter lives in skillrt-infra.

use std::path::{Path, PathBuf};

/// The leading bytes of a file together with its full size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContents {
    pub bytes: Vec<u8>,
    pub total_len: u64,
}

impl FileContents {
    pub fn truncated(&self) -> bool {
        (self.bytes.len() as u64) < self.total_len
    }
}

/// Abstraction over the read-only filesystem operations tools need.
pub trait FileSystem: Send + Sync {
    /// Resolve symlinks and `..` components. Fails if the path does not exist.
    fn canonicalize(
        &self,
        path: &Path,
    ) -> impl std::future::Future<Output = Result<PathBuf, std::io::Error>> + Send;

    /// Read at most `limit` bytes from the start of a regular file.
    fn read_prefix(
        &self,
        path: &Path,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<FileContents, std::io::Error>> + Send;

    /// Check whether a path exists and is a directory.
    fn is_dir(&self, path: &Path) -> impl std::future::Future<Output = bool> + Send;
}
