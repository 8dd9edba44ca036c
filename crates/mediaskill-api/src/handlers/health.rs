//! Health check handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::state::AppState;

/// Liveness probe - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness probe - completions can still be dispatched.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.dispatcher.is_open() {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready", "dispatcher": "open" })),
        )
    } else {
        tracing::error!("Readiness check failed: completion dispatcher stopped");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "not_ready", "dispatcher": "closed" })),
        )
    }
}
