//! Route configuration and setup

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use mediaskill_infra::request_id_middleware;

use crate::handlers::{health, skill, webhooks};
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.base.max_body_bytes;

    // Event deliveries and skill invocations share the root URL.
    let skill_routes = Router::new()
        .route("/", post(skill::invoke_skill))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            webhooks::azure_event_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health::liveness_check))
        .route("/health/ready", get(health::readiness_check));

    skill_routes
        .merge(health_routes)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}
