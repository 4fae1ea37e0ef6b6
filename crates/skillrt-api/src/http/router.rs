//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: presence trigger, CORS, tracing.

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Catalog
        .route("/skills", get(handlers::skill::list_skills))
        .route("/skills/refresh", post(handlers::skill::refresh_skills))
        .route("/prompt", get(handlers::prompt::catalog_prompt))
        // Sessions
        .route("/sessions", post(handlers::session::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::session::get_session).delete(handlers::session::delete_session),
        )
        .route(
            "/sessions/{id}/prompt",
            get(handlers::prompt::session_prompt),
        )
        // Tools
        .route(
            "/sessions/{id}/tools/{tool}",
            post(handlers::tool::call_tool),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(middleware::from_fn_with_state(state.clone(), trigger_presence))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Nudge the presence tracker on every request. Never waits on a scan.
async fn trigger_presence(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.presence.trigger() {
        tracing::debug!(path = %req.uri().path(), "Started background skill refresh");
    }
    next.run(req).await
}

/// GET /health - Liveness plus registry status.
async fn health_check(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    let snapshot = state.registry.snapshot();
    let status = if state.registry.ensure_available().is_ok() {
        "ok"
    } else {
        "degraded"
    };
    axum::Json(serde_json::json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "skills": snapshot.len(),
        "generation": snapshot.generation(),
        "refreshing": state.presence.is_running(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use skillrt_core::skill::source::SkillSource;
    use skillrt_types::config::RuntimeConfig;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::state::builtin_source;

    fn write_skill(data_dir: &Path, name: &str) {
        let dir = data_dir.join("skills").join(name);
        std::fs::create_dir_all(dir.join("scripts")).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: The {name} skill\n---\nUse {name} carefully.\n"),
        )
        .unwrap();
        std::fs::write(dir.join("guide.md"), format!("{name} guide")).unwrap();
    }

    async fn app() -> (TempDir, Router) {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "pdf");
        write_skill(tmp.path(), "xlsx");
        let builtin: Arc<dyn SkillSource> = Arc::new(builtin_source());
        let state =
            AppState::build(tmp.path().to_path_buf(), RuntimeConfig::default(), vec![builtin])
                .await;
        (tmp, build_router(state))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn create_session(app: &Router, initial: &[&str]) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "initial_skills": initial })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["session_id"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn health_reports_registry() {
        let (_tmp, app) = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["skills"], 3);
    }

    #[tokio::test]
    async fn lists_skills_with_presence() {
        let (_tmp, app) = app().await;

        let (status, body) = send(&app, Method::GET, "/api/v1/skills?type=filesystem", None).await;
        assert_eq!(status, StatusCode::OK);
        let skills = body["data"].as_array().unwrap();
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0]["name"], "pdf");
        assert_eq!(skills[0]["presence"]["status"], "present");
        assert!(skills[0].get("instructions").is_none());

        let (_, body) = send(&app, Method::GET, "/api/v1/skills?type=embedded", None).await;
        assert_eq!(body["data"][0]["name"], "skill-authoring");
    }

    #[tokio::test]
    async fn refresh_returns_report() {
        let (tmp, app) = app().await;
        write_skill(tmp.path(), "docx");

        let (status, body) = send(&app, Method::POST, "/api/v1/skills/refresh", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["failed"], false);

        let (_, body) = send(&app, Method::GET, "/api/v1/skills?name_prefix=doc", None).await;
        assert_eq!(body["data"][0]["name"], "docx");
    }

    #[tokio::test]
    async fn session_tool_flow() {
        let (_tmp, app) = app().await;
        let sid = create_session(&app, &[]).await;
        let tools = format!("/api/v1/sessions/{sid}/tools");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("{tools}/skills.load"),
            Some(json!({"names": ["pdf", "xlsx"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["active_skills"].as_array().unwrap().len(), 2);

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("{tools}/skills.read"),
            Some(json!({"path": "guide.md"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["skill"], "xlsx");
        assert_eq!(body["data"]["content"], "xlsx guide");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("{tools}/skills.read"),
            Some(json!({"path": "../../etc/passwd"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "path_escape");

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("{tools}/skills.unload"),
            Some(json!({"all": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("{tools}/skills.read"),
            Some(json!({"path": "guide.md"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errors"][0]["code"], "no_active_skill");
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_body_are_rejected() {
        let (_tmp, app) = app().await;
        let sid = create_session(&app, &[]).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{sid}/tools/skills.delete"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "unknown_tool");

        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/sessions/{sid}/tools/skills.load"))
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn session_prompt_orders_active_bodies() {
        let (_tmp, app) = app().await;
        let sid = create_session(&app, &["xlsx", "pdf"]).await;

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/sessions/{sid}/prompt?tool_only=true"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let prompt = body["data"]["prompt"].as_str().unwrap();
        let xlsx = prompt.find("Use xlsx carefully.").unwrap();
        let pdf = prompt.find("Use pdf carefully.").unwrap();
        assert!(xlsx < pdf);
        assert!(!prompt.contains("<location>"));
    }

    #[tokio::test]
    async fn catalog_prompt_has_no_active_section() {
        let (_tmp, app) = app().await;
        let (status, body) = send(&app, Method::GET, "/api/v1/prompt?name_prefix=p", None).await;
        assert_eq!(status, StatusCode::OK);
        let prompt = body["data"]["prompt"].as_str().unwrap();
        assert!(prompt.contains("<name>pdf</name>"));
        assert!(!prompt.contains("<name>xlsx</name>"));
        assert!(!prompt.contains("<active_skills>"));
    }

    #[tokio::test]
    async fn session_filter_hides_other_skills() {
        let (_tmp, app) = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({"filter": {"kinds": ["filesystem"], "name_prefix": "pdf"}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let sid = body["data"]["session_id"].as_str().unwrap().to_owned();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{sid}/tools/skills.load"),
            Some(json!({"names": ["xlsx"]})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "not_found");

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/sessions/{sid}/prompt"), None).await;
        let prompt = body["data"]["prompt"].as_str().unwrap();
        assert!(prompt.contains("<name>pdf</name>"));
        assert!(!prompt.contains("<name>xlsx</name>"));
        assert!(!prompt.contains("<name>skill-authoring</name>"));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({"initial_skills": ["xlsx"], "filter": {"name_prefix": "pdf"}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "not_found");
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let (_tmp, app) = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({"max_active": 1, "initial_skills": ["pdf", "xlsx"]})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errors"][0]["code"], "cap_exceeded");

        let sid = create_session(&app, &["pdf"]).await;
        let uri = format!("/api/v1/sessions/{sid}");

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["active_skills"][0]["name"], "pdf");
        assert_eq!(body["data"]["max_active"], 8);

        let (_, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(body["data"]["closed"], true);
        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["closed"], false);

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "session_not_found");

        let (status, _) = send(&app, Method::GET, "/api/v1/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
