//! HTTP API for the UI layer.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/chapters/{day}` | Chapter record for `day` |
//! | `GET`  | `/today` | Chapter record for the current day of month |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid day 40: must be between 1 and 31" } }
//! ```
//!
//! Error codes: `bad_request` (400) for a malformed or out-of-range day;
//! `source_unavailable`, `generation_failed` or `unavailable` (503) when
//! the request could not be served. A `200` response always carries a
//! complete record, possibly with default fields.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser UIs can call
//! the API directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::WisdomError;
use crate::models::ChapterContent;
use crate::pipeline::DailyPipeline;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<DailyPipeline>,
}

/// Start the server on `[server].bind` and run until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Arc::new(DailyPipeline::from_config(config)?);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

/// Routes with CORS, for embedding in another server or in tests.
pub fn router(pipeline: Arc<DailyPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chapters/{day}", get(handle_chapter))
        .route("/today", get(handle_today))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { pipeline })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn classify_error(err: anyhow::Error) -> AppError {
    let (status, code) = match err.downcast_ref::<WisdomError>() {
        Some(e @ WisdomError::InvalidDay { .. }) => (StatusCode::BAD_REQUEST, e.code()),
        Some(e) => (StatusCode::SERVICE_UNAVAILABLE, e.code()),
        None => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
    };
    AppError {
        status,
        code: code.to_string(),
        message: format!("{:#}", err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /chapters/{day} ============

async fn handle_chapter(
    State(state): State<AppState>,
    Path(day): Path<String>,
) -> Result<Json<ChapterContent>, AppError> {
    let day: u32 = day
        .parse()
        .map_err(|_| bad_request(format!("day must be a positive integer, got '{}'", day)))?;
    chapter_response(&state, day).await
}

// ============ GET /today ============

async fn handle_today(State(state): State<AppState>) -> Result<Json<ChapterContent>, AppError> {
    let day = state.pipeline.today();
    chapter_response(&state, day).await
}

async fn chapter_response(state: &AppState, day: u32) -> Result<Json<ChapterContent>, AppError> {
    let report = state
        .pipeline
        .fetch_report(day)
        .await
        .map_err(classify_error)?;
    Ok(Json(report.content))
}
