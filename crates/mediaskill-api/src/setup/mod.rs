//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use mediaskill_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    mediaskill_infra::init_telemetry(&config.base).context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.base.environment,
        language = %config.language(),
        account = %config.azure.account_name,
        "Configuration loaded and validated successfully"
    );

    let collaborators = services::initialize_collaborators(&config)?;
    let state = Arc::new(AppState::new(config, collaborators));

    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
