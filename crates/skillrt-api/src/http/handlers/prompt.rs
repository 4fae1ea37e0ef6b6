//! Prompt HTTP handlers.
//!
//! Endpoints:
//! - GET /api/v1/prompt               - Catalog prompt, no session
//! - GET /api/v1/sessions/{id}/prompt - Full prompt for a session

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skillrt_core::prompt::PromptOptions;
use skillrt_types::skill::SkillKind;

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::http::handlers::skill::FilterQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Per-call catalog filter plus rendering options.
#[derive(Debug, Default, Deserialize)]
pub struct PromptQuery {
    #[serde(rename = "type")]
    pub kind: Option<SkillKind>,
    pub name_prefix: Option<String>,
    pub location_prefix: Option<String>,
    #[serde(default)]
    pub tool_only: bool,
}

impl PromptQuery {
    fn options(self) -> PromptOptions {
        let filter = FilterQuery {
            kind: self.kind,
            name_prefix: self.name_prefix,
            location_prefix: self.location_prefix,
        };
        let narrowed =
            filter.kind.is_some() || filter.name_prefix.is_some() || filter.location_prefix.is_some();
        PromptOptions {
            filter: narrowed.then(|| filter.to_filter()),
            tool_only: self.tool_only,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PromptBody {
    pub prompt: String,
}

/// GET /api/v1/prompt - Base rule and catalog.
pub async fn catalog_prompt(
    State(state): State<AppState>,
    Query(query): Query<PromptQuery>,
) -> Result<Json<ApiResponse<PromptBody>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let prompt = state.prompts.catalog_prompt(&query.options())?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(PromptBody { prompt }, request_id, elapsed)))
}

/// GET /api/v1/sessions/{id}/prompt - Prompt for the session's next model call.
pub async fn session_prompt(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<PromptQuery>,
) -> Result<Json<ApiResponse<PromptBody>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let prompt = state.prompts.session_prompt(sid, &query.options()).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(PromptBody { prompt }, request_id, elapsed)
            .with_link("session", &format!("/api/v1/sessions/{sid}")),
    ))
}
