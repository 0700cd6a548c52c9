//! HTTP front end for the JSON host.
//!
//! Routes:
//! - `POST /transform` - one work request, 200 when completed, 422 when failed
//! - `POST /transform/batch` - NDJSON work requests, one completion each
//! - `DELETE /transform/:id` - abort notification, 202
//! - `GET /transforms` - registered transforms
//! - `GET /health` - liveness

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::serialization::NdjsonReader;
use crate::wire::{JsonHost, WorkCompletion, WorkRequest};

#[derive(Clone)]
struct AppState {
    host: JsonHost,
}

/// Build the router serving `host`.
pub fn router(host: JsonHost) -> Router {
    let state = Arc::new(AppState { host });

    Router::new()
        .route("/transform", post(transform))
        .route("/transform/batch", post(transform_batch))
        .route("/transform/:id", delete(abort))
        .route("/transforms", get(transforms))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run a single work request
async fn transform(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<(StatusCode, Json<WorkCompletion>), AppError> {
    let request: WorkRequest = serde_json::from_str(&body)
        .map_err(|e| AppError::ValidationError(format!("Invalid work request: {}", e)))?;

    let completion = state.host.process(request);
    let status = if completion.is_completed() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    Ok((status, Json(completion)))
}

/// Run a batch of NDJSON work requests
async fn transform_batch(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<BatchResponse>, AppError> {
    let start = std::time::Instant::now();

    // Transforms are arbitrary synchronous code; keep them off the async workers
    let completions = tokio::task::spawn_blocking(move || {
        NdjsonReader::<_, WorkRequest>::new(body.as_bytes())
            .map(|request| match request {
                Ok(request) => state.host.process(request),
                Err(message) => state.host.reject(message),
            })
            .collect::<Vec<WorkCompletion>>()
    })
    .await
    .map_err(|e| AppError::InternalError(format!("Batch worker failed: {}", e)))?;

    let processed = completions.len();
    let completed = completions.iter().filter(|c| c.is_completed()).count();
    let failed = processed - completed;

    Ok(Json(BatchResponse {
        status: if failed == 0 { "success" } else { "partial" }.to_string(),
        processed,
        completed,
        failed,
        completions,
        duration_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Abort notification; acknowledged, nothing is interrupted
async fn abort(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<WorkCompletion>), AppError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::ValidationError("Invalid UUID format".to_string()))?;

    Ok((StatusCode::ACCEPTED, Json(state.host.abort(id))))
}

/// Registered transforms
async fn transforms(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let registry = state.host.registry();
    let entries: Vec<serde_json::Value> = registry
        .entries()
        .into_iter()
        .map(|(input, output)| {
            serde_json::json!({
                "input": registry.display_name(input),
                "output": registry.display_name(output),
            })
        })
        .collect();

    Json(serde_json::json!({ "transforms": entries }))
}

/// Health check endpoint (liveness)
async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "transform-workitem",
        "version": env!("CARGO_PKG_VERSION"),
        "transforms": state.host.registry().len(),
    }))
}

// Error handling

#[derive(Debug)]
enum AppError {
    ValidationError(String),
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({
            "error": message
        }))).into_response()
    }
}

// Response types

#[derive(Debug, Serialize)]
struct BatchResponse {
    status: String,
    processed: usize,
    completed: usize,
    failed: usize,
    completions: Vec<WorkCompletion>,
    duration_ms: u64,
}
