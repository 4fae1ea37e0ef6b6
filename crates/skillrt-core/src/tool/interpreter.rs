//! Script extension to interpreter mapping.

use std::collections::BTreeMap;
use std::path::Path;

use skillrt_types::error::SkillError;

/// Built-in interpreters, keyed by file extension.
pub const DEFAULT_INTERPRETERS: &[(&str, &str)] = &[
    ("sh", "sh"),
    ("bash", "bash"),
    ("py", "python3"),
    ("js", "node"),
    ("rb", "ruby"),
    ("pl", "perl"),
];

/// Extension to interpreter lookup, defaults plus configured overrides.
///
/// An override value may carry extra arguments (`"deno run"`); they are
/// passed before the script path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterTable {
    entries: BTreeMap<String, String>,
}

impl Default for InterpreterTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_INTERPRETERS
                .iter()
                .map(|(ext, program)| ((*ext).to_owned(), (*program).to_owned()))
                .collect(),
        }
    }
}

impl InterpreterTable {
    /// Defaults with `overrides` merged on top. An empty value removes the
    /// extension.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut table = Self::default();
        for (ext, program) in overrides {
            let ext = ext.trim_start_matches('.').to_ascii_lowercase();
            if program.trim().is_empty() {
                table.entries.remove(&ext);
            } else {
                table.entries.insert(ext, program.trim().to_owned());
            }
        }
        table
    }

    /// Resolve the program and leading arguments for a script path.
    pub fn resolve(&self, script: &Path) -> Result<(String, Vec<String>), SkillError> {
        let ext = script
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let command = self
            .entries
            .get(&ext)
            .ok_or_else(|| SkillError::UnsupportedExtension {
                extension: ext.clone(),
            })?;

        let mut words = command.split_whitespace().map(str::to_owned);
        let program = words.next().unwrap_or_default();
        Ok((program, words.collect()))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_maps_known_extensions() {
        let table = InterpreterTable::default();
        let (program, args) = table.resolve(Path::new("scripts/run.py")).unwrap();
        assert_eq!(program, "python3");
        assert!(args.is_empty());
        assert_eq!(table.resolve(Path::new("a.SH")).unwrap().0, "sh");
        assert_eq!(table.resolve(Path::new("a.js")).unwrap().0, "node");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let table = InterpreterTable::default();
        assert_eq!(
            table.resolve(Path::new("scripts/tool.exe")).unwrap_err(),
            SkillError::UnsupportedExtension {
                extension: "exe".into()
            }
        );
        assert!(matches!(
            table.resolve(Path::new("scripts/Makefile")),
            Err(SkillError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn overrides_replace_add_and_remove() {
        let overrides = BTreeMap::from([
            ("py".to_owned(), "python3.12".to_owned()),
            (".ts".to_owned(), "deno run".to_owned()),
            ("pl".to_owned(), String::new()),
        ]);
        let table = InterpreterTable::with_overrides(&overrides);

        assert_eq!(table.resolve(Path::new("a.py")).unwrap().0, "python3.12");
        let (program, args) = table.resolve(Path::new("a.ts")).unwrap();
        assert_eq!(program, "deno");
        assert_eq!(args, vec!["run".to_owned()]);
        assert!(table.resolve(Path::new("a.pl")).is_err());
    }
}
