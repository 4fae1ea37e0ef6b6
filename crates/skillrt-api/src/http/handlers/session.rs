//! Session HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/sessions      - Create a session
//! - GET    /api/v1/sessions/{id} - Get a session
//! - DELETE /api/v1/sessions/{id} - Close a session (idempotent)

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use skillrt_types::session::{CreateSessionRequest, SessionInfo};

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CloseResult {
    pub session_id: Uuid,
    /// False when the session was already gone.
    pub closed: bool,
}

fn session_links(resp: ApiResponse<SessionInfo>, id: Uuid) -> ApiResponse<SessionInfo> {
    resp.with_link("self", &format!("/api/v1/sessions/{id}"))
        .with_link("prompt", &format!("/api/v1/sessions/{id}/prompt"))
        .with_link("tools", &format!("/api/v1/sessions/{id}/tools"))
}

/// POST /api/v1/sessions - Create a session, optionally seeded with skills.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionInfo>>), AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let info = state
        .sessions
        .create_session(req.max_active, &req.initial_skills, req.filter)?;

    let elapsed = start.elapsed().as_millis() as u64;
    let id = info.session_id;
    let resp = session_links(ApiResponse::success(info, request_id, elapsed), id);
    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/sessions/{id} - Get a session by ID.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let info = state.sessions.session_info(sid).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(session_links(
        ApiResponse::success(info, request_id, elapsed),
        sid,
    )))
}

/// DELETE /api/v1/sessions/{id} - Close a session.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<CloseResult>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let closed = state.sessions.close_session(sid);

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        CloseResult {
            session_id: sid,
            closed,
        },
        request_id,
        elapsed,
    )))
}
