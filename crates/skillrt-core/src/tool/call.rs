//! Boundary parsing of tool calls.

use serde::de::DeserializeOwned;
use skillrt_types::error::SkillError;
use skillrt_types::tool::{LoadArgs, ReadArgs, RunScriptArgs, ToolKind, UnloadArgs};

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Load(LoadArgs),
    Unload(UnloadArgs),
    Read(ReadArgs),
    RunScript(RunScriptArgs),
}

impl ToolCall {
    /// Parse a tool name and its JSON arguments.
    ///
    /// Unknown names are `UnknownTool`; arguments that do not match the
    /// tool's schema are `InvalidArgument`. A JSON `null` is treated as `{}`.
    pub fn parse(name: &str, args: serde_json::Value) -> Result<Self, SkillError> {
        let kind: ToolKind = name.parse()?;
        let args = match args {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };

        let call = match kind {
            ToolKind::Load => Self::Load(decode(kind, args)?),
            ToolKind::Unload => {
                let args: UnloadArgs = decode(kind, args)?;
                if args.names.is_none() && !args.all {
                    return Err(SkillError::InvalidArgument(
                        "skills.unload needs either names or all: true".to_owned(),
                    ));
                }
                Self::Unload(args)
            }
            ToolKind::Read => Self::Read(decode(kind, args)?),
            ToolKind::RunScript => {
                let args: RunScriptArgs = decode(kind, args)?;
                if args.timeout_ms == Some(0) {
                    return Err(SkillError::InvalidArgument(
                        "timeout_ms must be positive".to_owned(),
                    ));
                }
                Self::RunScript(args)
            }
        };
        Ok(call)
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Load(_) => ToolKind::Load,
            Self::Unload(_) => ToolKind::Unload,
            Self::Read(_) => ToolKind::Read,
            Self::RunScript(_) => ToolKind::RunScript,
        }
    }
}

fn decode<T: DeserializeOwned>(kind: ToolKind, args: serde_json::Value) -> Result<T, SkillError> {
    serde_json::from_value(args)
        .map_err(|e| SkillError::InvalidArgument(format!("{kind}: {e}")))
}
