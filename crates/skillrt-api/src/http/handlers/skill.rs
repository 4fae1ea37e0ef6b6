//! Skill catalog HTTP handlers.
//!
//! Endpoints:
//! - GET  /api/v1/skills          - List indexed skills with presence
//! - POST /api/v1/skills/refresh  - Rescan sources now

use std::path::PathBuf;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skillrt_core::skill::registry::RefreshReport;
use skillrt_types::presence::PresenceRecord;
use skillrt_types::skill::{SkillFilter, SkillKind, SkillRecord};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Listing filter taken from the query string.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(rename = "type")]
    pub kind: Option<SkillKind>,
    pub name_prefix: Option<String>,
    pub location_prefix: Option<String>,
}

impl FilterQuery {
    pub fn to_filter(&self) -> SkillFilter {
        let mut filter = SkillFilter::all();
        if let Some(kind) = self.kind {
            filter = filter.with_kind(kind);
        }
        if let Some(prefix) = &self.name_prefix {
            filter = filter.with_name_prefix(prefix.clone());
        }
        if let Some(prefix) = &self.location_prefix {
            filter = filter.with_location_prefix(prefix.clone());
        }
        filter
    }
}

/// A registry record as listed over HTTP: metadata without the body.
#[derive(Debug, Serialize)]
pub struct SkillSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SkillKind,
    pub location: String,
    pub root_dir: Option<PathBuf>,
    pub description: String,
    pub digest: String,
    pub enabled: bool,
    pub properties: serde_json::Value,
    pub presence: Option<PresenceRecord>,
}

impl SkillSummary {
    pub fn new(record: &SkillRecord, presence: Option<PresenceRecord>) -> Self {
        Self {
            name: record.def.name.clone(),
            kind: record.def.kind,
            location: record.def.location.clone(),
            root_dir: record.root_dir.clone(),
            description: record.description.clone(),
            digest: record.digest.clone(),
            enabled: record.enabled,
            properties: serde_json::to_value(&record.properties).unwrap_or_default(),
            presence,
        }
    }
}

/// GET /api/v1/skills - List skills visible through the filter.
pub async fn list_skills(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ApiResponse<Vec<SkillSummary>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state.registry.ensure_available()?;
    let skills: Vec<SkillSummary> = state
        .registry
        .list(&query.to_filter())
        .iter()
        .map(|r| SkillSummary::new(r, state.presence_book.get(&r.def)))
        .collect();

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(skills, request_id, elapsed).with_link("self", "/api/v1/skills"),
    ))
}

/// POST /api/v1/skills/refresh - Force a registry refresh.
///
/// Waits for any in-flight background refresh, then rescans inline.
pub async fn refresh_skills(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RefreshReport>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if let Err(e) = state.presence.force().await {
        tracing::warn!(error = %e, "Forced refresh failed");
    }
    let report = state
        .presence_book
        .last_report()
        .ok_or_else(|| AppError::Internal("refresh produced no report".to_string()))?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(report, request_id, elapsed)))
}
