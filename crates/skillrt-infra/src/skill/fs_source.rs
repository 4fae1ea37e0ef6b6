//! Filesystem skill source.
//!
//! Scans one root directory for skill packages. Each package is a
//! subdirectory holding a `SKILL.md` and, optionally, resources and a
//! `scripts/` directory:
//!
//! ```text
//! {root}/{skill-name}/
//!   SKILL.md
//!   scripts/
//!   ...
//! ```

use std::path::{Path, PathBuf};

use skillrt_core::skill::source::{SkillSource, SourceEntry};
use skillrt_types::error::SkillError;
use skillrt_types::skill::{location_for_path, SkillKind, MANIFEST_FILE};

/// A [`SkillSource`] backed by one directory of skill packages.
#[derive(Debug, Clone)]
pub struct FsSkillSource {
    id: String,
    root: PathBuf,
}

impl FsSkillSource {
    /// Create a source for `root`. Relative roots are made absolute so
    /// record locations are absolute paths.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            id: format!("fs:{}", root.display()),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> SkillError {
        SkillError::SourceUnavailable {
            source_id: self.id.clone(),
            reason: reason.to_string(),
        }
    }
}

impl SkillSource for FsSkillSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SkillKind {
        SkillKind::Filesystem
    }

    /// List every `*/SKILL.md` under the root.
    ///
    /// A root that does not exist yet scans as empty. A root that exists but
    /// cannot be listed makes the whole source unavailable. Individual
    /// unreadable packages are skipped with a warning.
    fn scan(&self) -> Result<Vec<SourceEntry>, SkillError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(root = %self.root.display(), "Skill root does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.unavailable(e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(root = %self.root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let manifest_path = path.join(MANIFEST_FILE);
            if !manifest_path.is_file() {
                continue;
            }

            let dir_name = path.file_name().and_then(|n| n.to_str()).map(str::to_owned);
            match std::fs::read_to_string(&manifest_path) {
                Ok(content) => found.push(SourceEntry {
                    location: location_for_path(&manifest_path),
                    root_dir: Some(path),
                    dir_name,
                    content,
                }),
                Err(e) => {
                    tracing::warn!(
                        skill = dir_name.as_deref().unwrap_or("unknown"),
                        error = %e,
                        "Skipping unreadable skill manifest"
                    );
                }
            }
        }

        found.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_skill(root: &Path, name: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(dir.join("scripts")).unwrap();
        std::fs::write(
            dir.join(MANIFEST_FILE),
            format!("---\nname: {name}\ndescription: test skill\n---\nBody of {name}.\n"),
        )
        .unwrap();
    }

    #[test]
    fn scans_packages_with_manifests() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "pdf");
        write_skill(tmp.path(), "docx");
        std::fs::create_dir_all(tmp.path().join("no-manifest")).unwrap();
        std::fs::write(tmp.path().join("stray.md"), "not a package").unwrap();

        let source = FsSkillSource::new(tmp.path());
        let entries = source.scan().unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.dir_name.clone().unwrap()).collect();
        assert_eq!(names, vec!["docx", "pdf"]);
        assert!(entries[1].location.ends_with("pdf/SKILL.md"));
        assert_eq!(entries[1].root_dir.as_deref(), Some(tmp.path().join("pdf").as_path()));
        assert!(entries[1].content.contains("Body of pdf."));
    }

    #[test]
    fn missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let source = FsSkillSource::new(tmp.path().join("not-created"));
        assert!(source.scan().unwrap().is_empty());
    }

    #[test]
    fn root_that_is_a_file_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("skills");
        std::fs::write(&file, "oops").unwrap();

        let source = FsSkillSource::new(&file);
        match source.scan() {
            Err(SkillError::SourceUnavailable { source_id, .. }) => {
                assert_eq!(source_id, source.id());
            }
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn id_and_kind() {
        let source = FsSkillSource::new("/opt/skills");
        assert_eq!(source.id(), "fs:/opt/skills");
        assert_eq!(source.kind(), SkillKind::Filesystem);
        assert!(source.root().is_absolute());
    }
}
