use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the skills runtime.
///
/// Every variant carries only owned strings so errors can be cloned into
/// refresh reports and presence records. [`SkillError::code`] gives the
/// stable wire identifier returned to the model in tool failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SkillError {
    #[error("skill '{name}' not found")]
    NotFound { name: String },

    #[error("activating {requested} skills would exceed the session limit of {max}")]
    CapExceeded { requested: usize, max: usize },

    #[error("skill '{name}' is disabled")]
    Disabled { name: String },

    #[error("no skill is active in this session; load one with skills.load first")]
    NoActiveSkill,

    #[error("skill '{name}' is not active in this session")]
    SkillNotActive { name: String },

    #[error("path '{path}' escapes the skill root")]
    PathEscape { path: String },

    #[error("file '{path}' not found in skill")]
    FileNotFound { path: String },

    #[error("skill '{name}' has no resource directory")]
    NoResources { name: String },

    #[error("no interpreter registered for extension '{extension}'")]
    UnsupportedExtension { extension: String },

    #[error("script timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("script was cancelled")]
    Cancelled,

    #[error("failed to spawn '{program}': {reason}")]
    SpawnFailure { program: String, reason: String },

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("skill source '{source_id}' unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    #[error("failed to parse skill manifest at {location}: {reason}")]
    ParseError { location: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("io error: {0}")]
    Io(String),
}

impl SkillError {
    /// Stable snake_case identifier for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::FileNotFound { .. } => "not_found",
            Self::CapExceeded { .. } => "cap_exceeded",
            Self::Disabled { .. } => "disabled",
            Self::NoActiveSkill => "no_active_skill",
            Self::SkillNotActive { .. } => "skill_not_active",
            Self::PathEscape { .. } => "path_escape",
            Self::NoResources { .. } => "no_resources",
            Self::UnsupportedExtension { .. } => "unsupported_extension",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::SpawnFailure { .. } => "spawn_failure",
            Self::SessionNotFound(_) => "session_not_found",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::ParseError { .. } => "parse_error",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnknownTool(_) => "unknown_tool",
            Self::Io(_) => "io_error",
        }
    }

    /// Whether the caller can recover by retrying with different arguments.
    ///
    /// Source and io failures are infrastructure problems; everything else
    /// is a rejection of the specific request.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SourceUnavailable { .. } | Self::Io(_))
    }
}

impl From<std::io::Error> for SkillError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
