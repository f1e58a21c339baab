use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;

use glowell_core::export::{self, ExportFormat};
use glowell_core::{GenerateConfig, Generator, GuardError, PlanCache, normalize, validate};

use crate::config::{GlowellConfig, ServeSection};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, error = %self.message, "request failed");
        }
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared handler state. The generator is immutable; the cache locks
/// internally.
#[derive(Clone)]
pub struct AppState {
    generator: Arc<Generator>,
    cache: Arc<PlanCache>,
    maintenance: bool,
}

impl AppState {
    pub fn new(config: GenerateConfig, serve: &ServeSection) -> Result<Self, GuardError> {
        Ok(Self {
            generator: Arc::new(Generator::new(config)?),
            cache: Arc::new(PlanCache::new(serve.cache_capacity)),
            maintenance: serve.maintenance,
        })
    }

    fn ensure_available(&self) -> Result<(), AppError> {
        if self.maintenance {
            return Err(AppError::unavailable(
                "plan generation is paused for maintenance; try again later",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    format: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/plans", post(create_plan))
        .route("/api/plans/export", post(export_plan))
        .route("/api/validate", post(validate_intake))
        .route("/api/rules", get(list_rules))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: &GlowellConfig) -> Result<()> {
    let state = AppState::new(config.generate.clone(), &config.serve)
        .context("invalid compliance rules in config")?;
    let app = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.serve.bind, config.serve.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                config.serve.bind, config.serve.port
            )
        })?;
    tracing::info!(
        version = %config.generate.version,
        policy = %config.generate.policy,
        maintenance = config.serve.maintenance,
        "glowell serve listening on http://{addr}"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("glowell serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> &'static str {
    "ok"
}

async fn create_plan(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<axum::response::Response, AppError> {
    state.ensure_available()?;
    let Json(raw) = payload?;
    let outcome = state
        .cache
        .get_or_generate(&state.generator, &raw, Utc::now())
        .map_err(|e| AppError::internal(e.into()))?;

    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(outcome)).into_response())
}

async fn export_plan(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<axum::response::Response, AppError> {
    state.ensure_available()?;
    let Json(raw) = payload?;
    let format = match query.format.as_deref() {
        Some(s) => s
            .parse::<ExportFormat>()
            .map_err(|e| AppError::bad_request(e.to_string()))?,
        None => ExportFormat::default(),
    };

    let outcome = state
        .cache
        .get_or_generate(&state.generator, &raw, Utc::now())
        .map_err(|e| AppError::internal(e.into()))?;
    let Some(plan) = outcome.plan.as_ref() else {
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(outcome)).into_response());
    };

    let body = export::render(plan, format).map_err(|e| AppError::internal(e.into()))?;
    let file_name =
        export::export_file_name(plan, format).map_err(|e| AppError::internal(e.into()))?;
    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    Ok((headers, body).into_response())
}

async fn validate_intake(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(raw) = payload?;
    let intake = normalize(&raw);
    let issues = validate(&intake);
    Ok(Json(serde_json::json!({ "intake": intake, "issues": issues })))
}

async fn list_rules(State(state): State<AppState>) -> axum::response::Response {
    let rules: Vec<_> = state.generator.guard().rules().collect();
    Json(rules).into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use glowell_core::{GenerateConfig, ViolationPolicy};
    use glowell_test_utils::{asha_raw, risky_raw, same_wake_sleep_raw};

    use super::{AppState, build_router};
    use crate::config::ServeSection;

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn state_with(config: GenerateConfig, maintenance: bool) -> AppState {
        let serve = ServeSection {
            maintenance,
            ..ServeSection::default()
        };
        AppState::new(config, &serve).unwrap()
    }

    fn default_state() -> AppState {
        state_with(GenerateConfig::default(), false)
    }

    async fn get(state: AppState, uri: &str) -> axum::response::Response {
        build_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_body(state: AppState, uri: &str, body: String) -> axum::response::Response {
        build_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn post_json(state: AppState, uri: &str, body: &Value) -> axum::response::Response {
        post_body(state, uri, body.to_string()).await
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_health() {
        let resp = get(default_state(), "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await, b"ok");
    }

    #[tokio::test]
    async fn test_create_plan_ok() {
        let resp = post_json(default_state(), "/api/plans", &asha_raw()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["plan"]["day"]["wake"], "06:00");
        assert_eq!(json["plan"]["meta"]["disclaimerId"], "glowell-general-v2");
        assert!(json["plan"]["meta"]["disclaimerText"].is_string());
        assert_eq!(json["issues"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_create_plan_validation_failure_is_422() {
        let resp = post_json(default_state(), "/api/plans", &same_wake_sleep_raw()).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert!(json["plan"].is_null());
        assert_eq!(json["issues"][0]["path"], "schedule.sleepTime");
    }

    #[tokio::test]
    async fn test_create_plan_blocked_is_422() {
        let state = state_with(
            GenerateConfig::default().policy(ViolationPolicy::Block),
            false,
        );
        let resp = post_json(state, "/api/plans", &risky_raw()).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert!(json["plan"].is_null());
        assert_eq!(json["violations"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_maintenance_mode_is_503() {
        let resp = post_json(state_with(GenerateConfig::default(), true), "/api/plans", &asha_raw()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("maintenance"));
    }

    #[tokio::test]
    async fn test_repeated_requests_hit_the_cache() {
        let state = default_state();
        let first = body_json(post_json(state.clone(), "/api/plans", &asha_raw()).await).await;
        let second = body_json(post_json(state.clone(), "/api/plans", &asha_raw()).await).await;
        assert_eq!(first, second);
        assert_eq!(state.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_validate_endpoint() {
        let resp = post_json(default_state(), "/api/validate", &same_wake_sleep_raw()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["issues"].as_array().unwrap().len(), 1);
        assert_eq!(json["intake"]["schedule"]["wakeTime"], "07:00");
    }

    #[tokio::test]
    async fn test_list_rules() {
        let resp = get(default_state(), "/api/rules").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let rules = json.as_array().unwrap();
        assert_eq!(rules.len(), 5);
        assert_eq!(rules[4]["reason"], "absolute claim softened");
    }

    #[tokio::test]
    async fn test_export_text() {
        let resp = post_json(default_state(), "/api/plans/export?format=text", &asha_raw()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"), "got {content_type}");
        let disposition = resp.headers()["content-disposition"].to_str().unwrap().to_string();
        assert!(disposition.contains("glowell-plan-") && disposition.ends_with(".txt\""));
        let text = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(text.starts_with("*Your daily wellness plan*"));
    }

    #[tokio::test]
    async fn test_export_unknown_format_is_400() {
        let resp = post_json(default_state(), "/api/plans/export?format=pdf", &asha_raw()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_400_with_error_body() {
        for uri in ["/api/plans", "/api/plans/export?format=csv", "/api/validate"] {
            let resp = post_body(default_state(), uri, "{\"name\": ".to_string()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            let json = body_json(resp).await;
            assert!(json["error"].is_string(), "{uri}: {json}");
        }
    }
}
