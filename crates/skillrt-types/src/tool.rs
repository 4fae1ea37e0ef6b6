//! Payloads of the four model-callable skill tools.
//!
//! Argument structs reject unknown fields so a malformed call fails at the
//! boundary instead of being silently reinterpreted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::SkillError;
use crate::skill::{LoadMode, SkillKind, SkillRecord};

// ---------------------------------------------------------------------------
// Tool identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    #[serde(rename = "skills.load")]
    Load,
    #[serde(rename = "skills.unload")]
    Unload,
    #[serde(rename = "skills.read")]
    Read,
    #[serde(rename = "skills.run_script")]
    RunScript,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [Self::Load, Self::Unload, Self::Read, Self::RunScript];

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Load => "skills.load",
            Self::Unload => "skills.unload",
            Self::Read => "skills.read",
            Self::RunScript => "skills.run_script",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ToolKind {
    type Err = SkillError;

    /// Accepts the wire name or its bare suffix (`load`, `run_script`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix("skills.").unwrap_or(s);
        match bare {
            "load" => Ok(Self::Load),
            "unload" => Ok(Self::Unload),
            "read" => Ok(Self::Read),
            "run_script" => Ok(Self::RunScript),
            _ => Err(SkillError::UnknownTool(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadArgs {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub mode: LoadMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnloadArgs {
    #[serde(default)]
    pub names: Option<Vec<String>>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadArgs {
    #[serde(default)]
    pub skill: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunScriptArgs {
    #[serde(default)]
    pub skill: Option<String>,
    pub path: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// One entry of the receipt returned by `skills.load` and `skills.unload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSkill {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SkillKind,
    pub location: String,
    pub root_dir: Option<PathBuf>,
    pub description: String,
    pub digest: String,
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl From<&SkillRecord> for ActiveSkill {
    fn from(record: &SkillRecord) -> Self {
        Self {
            name: record.def.name.clone(),
            kind: record.def.kind,
            location: record.def.location.clone(),
            root_dir: record.root_dir.clone(),
            description: record.description.clone(),
            digest: record.digest.clone(),
            properties: record.properties.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSkillsOutput {
    pub active_skills: Vec<ActiveSkill>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentEncoding {
    Utf8,
    Base64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOutput {
    pub skill: String,
    pub path: String,
    pub encoding: ContentEncoding,
    pub content: String,
    /// Size of the file on disk, before truncation.
    pub bytes: u64,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunScriptOutput {
    pub skill: String,
    pub path: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub truncated_stdout: bool,
    pub truncated_stderr: bool,
}

/// Structured failure handed back to the model instead of aborting the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub code: String,
    pub message: String,
}

impl From<SkillError> for ToolFailure {
    fn from(err: SkillError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_kind_parses_wire_and_bare_names() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.wire_name().parse::<ToolKind>().unwrap(), kind);
        }
        assert_eq!("run_script".parse::<ToolKind>().unwrap(), ToolKind::RunScript);
        assert!(matches!(
            "skills.delete".parse::<ToolKind>(),
            Err(SkillError::UnknownTool(_))
        ));
    }

    #[test]
    fn load_args_default_to_replace() {
        let args: LoadArgs = serde_json::from_str(r#"{"names":["pdf"]}"#).unwrap();
        assert_eq!(args.mode, LoadMode::Replace);
        assert_eq!(args.names, vec!["pdf".to_string()]);
    }

    #[test]
    fn args_reject_unknown_fields() {
        let result: Result<ReadArgs, _> = serde_json::from_str(r#"{"path":"a","pth":"b"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn tool_failure_from_error_uses_code() {
        let failure = ToolFailure::from(SkillError::NoActiveSkill);
        assert_eq!(failure.code, "no_active_skill");
        assert!(failure.message.contains("skills.load"));
    }

    #[test]
    fn read_output_serializes_encoding_lowercase() {
        let out = ReadOutput {
            skill: "pdf".to_string(),
            path: "README.md".to_string(),
            encoding: ContentEncoding::Base64,
            content: String::new(),
            bytes: 0,
            truncated: false,
        };
        let json = serde_json::to_value(out).unwrap();
        assert_eq!(json["encoding"], "base64");
    }
}
