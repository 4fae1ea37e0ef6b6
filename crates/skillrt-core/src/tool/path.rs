//! Lexical containment checks for paths supplied by the model.
//!
//! These run before touching the filesystem, so an escaping path is rejected
//! whether or not its target exists. Callers re-check after canonicalising
//! to catch symlinks.

use std::path::{Component, Path, PathBuf};

use skillrt_types::error::SkillError;

/// Normalise a relative path, resolving `.` and `..` without leaving the root.
///
/// Absolute paths, drive prefixes, and any `..` that would climb above the
/// starting point are rejected as `PathEscape`.
pub fn normalize_relative_path(raw: &str) -> Result<PathBuf, SkillError> {
    let escape = || SkillError::PathEscape {
        path: raw.to_owned(),
    };

    if raw.trim().is_empty() {
        return Err(SkillError::InvalidArgument("path must not be empty".to_owned()));
    }

    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return Err(escape()),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(escape());
                }
            }
            Component::Normal(segment) => parts.push(segment),
        }
    }

    Ok(parts.into_iter().collect())
}

/// Join `raw` onto `root` after lexical normalisation.
pub fn resolve_under_root(root: &Path, raw: &str) -> Result<PathBuf, SkillError> {
    Ok(root.join(normalize_relative_path(raw)?))
}

/// Fail with `PathEscape` unless `candidate` lies inside `root`.
pub fn ensure_within(root: &Path, candidate: &Path, raw: &str) -> Result<(), SkillError> {
    if candidate.starts_with(root) {
        Ok(())
    } else {
        Err(SkillError::PathEscape {
            path: raw.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_relative_paths_pass() {
        assert_eq!(
            normalize_relative_path("docs/guide.md").unwrap(),
            PathBuf::from("docs/guide.md")
        );
        assert_eq!(
            normalize_relative_path("./docs/../README.md").unwrap(),
            PathBuf::from("README.md")
        );
    }

    #[test]
    fn traversal_is_rejected() {
        for raw in ["../../etc/passwd", "..", "docs/../../x", "a/b/../../../c"] {
            assert!(
                matches!(
                    normalize_relative_path(raw),
                    Err(SkillError::PathEscape { .. })
                ),
                "{raw} should escape"
            );
        }
    }

    #[test]
    fn absolute_is_rejected() {
        assert!(matches!(
            normalize_relative_path("/etc/passwd"),
            Err(SkillError::PathEscape { .. })
        ));
    }

    #[test]
    fn empty_is_invalid() {
        assert!(matches!(
            normalize_relative_path("  "),
            Err(SkillError::InvalidArgument(_))
        ));
    }

    #[test]
    fn dot_resolves_to_root() {
        let root = Path::new("/skills/pdf");
        assert_eq!(resolve_under_root(root, ".").unwrap(), root);
    }

    #[test]
    fn ensure_within_checks_prefix_by_component() {
        let root = Path::new("/skills/pdf");
        assert!(ensure_within(root, Path::new("/skills/pdf/scripts/a.py"), "a").is_ok());
        assert!(ensure_within(root, Path::new("/skills/pdf-evil/a.py"), "a").is_err());
    }
}
