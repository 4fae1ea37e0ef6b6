//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use skillrt_types::error::SkillError;
use skillrt_types::tool::ToolFailure;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Registry or session errors.
    Skill(SkillError),
    /// A tool call that failed; already in wire form.
    Tool(ToolFailure),
    /// Malformed request (bad UUID, bad JSON body).
    Validation(String),
    Internal(String),
}

impl From<SkillError> for AppError {
    fn from(e: SkillError) -> Self {
        AppError::Skill(e)
    }
}

impl From<ToolFailure> for AppError {
    fn from(f: ToolFailure) -> Self {
        AppError::Tool(f)
    }
}

/// HTTP status for a `SkillError` wire code.
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "not_found" | "session_not_found" => StatusCode::NOT_FOUND,
        "cap_exceeded" | "disabled" | "no_active_skill" | "skill_not_active"
        | "no_resources" => StatusCode::CONFLICT,
        "path_escape" | "invalid_argument" | "unknown_tool" | "unsupported_extension"
        | "parse_error" => StatusCode::BAD_REQUEST,
        "timeout" => StatusCode::GATEWAY_TIMEOUT,
        "cancelled" | "source_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            AppError::Skill(e) => (e.code().to_string(), e.to_string()),
            AppError::Tool(f) => (f.code, f.message),
            AppError::Validation(msg) => ("invalid_argument".to_string(), msg),
            AppError::Internal(msg) => ("internal_error".to_string(), msg),
        };
        let status = status_for_code(&code);
        if status.is_server_error() {
            tracing::error!(%code, %message, "Request failed");
        }

        let body = ApiResponse::error(&code, &message, Uuid::now_v7().to_string());
        (status, Json(body)).into_response()
    }
}
