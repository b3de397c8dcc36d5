//! # HTTP surface
//!
//! | route | reply |
//! |---|---|
//! | `GET /` | `{"message": "Backend is running!"}` |
//! | `POST /process-text` | `{"output": ...}` for `{"text": ..., "mode": ...}` |
//! | `GET /modes` | `{"modes": [{"mode": ..., "label": ...}]}` |
//!
//! Failures come back as `{"error": <kind>, "detail": <message>}`: `422` for a body that is not
//! a valid request, `400` for an unknown mode under the strict policy and `502` when the
//! completion service fails.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::{Config, ConfigError};
use crate::gateway::UpstreamError;
use crate::modes::mode_label;
use crate::processor::{ProcessError, TextProcessor};
use crate::prompt::errors::PromptError;

pub const HEALTH_MESSAGE: &str = "Backend is running!";

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessTextRequest {
    pub text: String,
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessTextResponse {
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeInfo {
    pub mode: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModesResponse {
    pub modes: Vec<ModeInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

/// Error replies of the HTTP surface.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Prompt(PromptError),
    Upstream(UpstreamError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<ProcessError> for ApiError {
    fn from(error: ProcessError) -> Self {
        match error {
            ProcessError::Prompt(e) => ApiError::Prompt(e),
            ProcessError::Upstream(e) => ApiError::Upstream(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, detail) = match self {
            ApiError::Validation(detail) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", detail),
            ApiError::Prompt(e @ PromptError::UnknownMode { .. }) => (StatusCode::BAD_REQUEST, "unknown_mode", e.to_string()),
            ApiError::Prompt(e) => (StatusCode::INTERNAL_SERVER_ERROR, "prompt_error", e.to_string()),
            ApiError::Upstream(e) => (StatusCode::BAD_GATEWAY, "upstream_error", e.to_string()),
        };
        let body = ErrorBody {
            error: kind.to_string(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    processor: Arc<TextProcessor>,
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": HEALTH_MESSAGE }))
}

async fn process_text(
    State(state): State<AppState>,
    payload: Result<Json<ProcessTextRequest>, JsonRejection>,
) -> Result<Json<ProcessTextResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("rejected request body: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;
    info!("Received request: {} - {}", request.mode, request.text);

    let output = state
        .processor
        .process(&request.text, &request.mode)
        .await
        .map_err(|e| {
            error!("processing mode `{}` failed: {}", request.mode, e);
            ApiError::from(e)
        })?;
    Ok(Json(ProcessTextResponse { output }))
}

async fn list_modes(State(state): State<AppState>) -> Json<ModesResponse> {
    let modes = state
        .processor
        .builder()
        .templates()
        .modes()
        .map(|mode| ModeInfo {
            mode: mode.to_string(),
            label: mode_label(mode),
        })
        .collect();
    Json(ModesResponse { modes })
}

/// Routes without CORS.
pub fn router(processor: Arc<TextProcessor>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/process-text", post(process_text))
        .route("/modes", get(list_modes))
        .with_state(AppState { processor })
}

/// CORS for an origin allow-list, with credentials.
pub fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let origins = allowed_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidOrigin(origin.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Routes with the CORS allow-list applied.
pub fn app(processor: Arc<TextProcessor>, allowed_origins: &[String]) -> Result<Router, ConfigError> {
    Ok(router(processor).layer(cors_layer(allowed_origins)?))
}

/// Serve until Ctrl-C.
pub async fn serve(config: &Config, processor: Arc<TextProcessor>) -> anyhow::Result<()> {
    let app = app(processor, &config.allowed_origins)?;
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);
    info!("allowed origins: {:?}", config.allowed_origins);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
