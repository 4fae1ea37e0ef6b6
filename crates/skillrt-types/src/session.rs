//! Session snapshot types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::skill::{SkillDef, SkillFilter};

/// Point-in-time view of one session, as returned to collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub active_skills: Vec<SkillDef>,
    pub max_active: usize,
}

/// Request body for creating a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub max_active: Option<usize>,
    #[serde(default)]
    pub initial_skills: Vec<String>,
    /// Skills outside this filter are invisible to the session.
    #[serde(default)]
    pub filter: SkillFilter,
}
