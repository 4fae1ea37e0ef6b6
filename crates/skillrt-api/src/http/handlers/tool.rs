//! Tool-call HTTP handler.
//!
//! Endpoint:
//! - POST /api/v1/sessions/{id}/tools/{tool} - Run one skill tool
//!
//! The body is the tool's JSON arguments; an empty body means `{}`. A tool
//! failure comes back as an error envelope carrying the wire code.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use tracing::Instrument;
use uuid::Uuid;

use skillrt_observe::skill_attrs;

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/sessions/{id}/tools/{tool} - Dispatch a tool call.
pub async fn call_tool(
    State(state): State<AppState>,
    Path((session_id, tool)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let args = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid JSON arguments: {e}")))?
    };

    let span = tracing::info_span!(
        "tool_call",
        skillrt.session.id = %sid,
        skillrt.tool.name = %tool,
        skillrt.tool.outcome = tracing::field::Empty,
    );
    let result = state
        .dispatcher
        .dispatch_named(sid, &tool, args)
        .instrument(span.clone())
        .await;

    match &result {
        Ok(_) => span.record(skill_attrs::TOOL_OUTCOME, skill_attrs::OUTCOME_OK),
        Err(failure) => span.record(skill_attrs::TOOL_OUTCOME, failure.code.as_str()),
    };
    let output = result?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(output, request_id, elapsed)))
}
