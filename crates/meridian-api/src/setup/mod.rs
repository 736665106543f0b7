//! Application setup and initialization
//!
//! Everything `main` needs before the listener opens: telemetry, the pool,
//! storage, services and the router.

pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use meridian_core::Config;
use meridian_infra::LogFormat;

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: &Config) -> Result<(Arc<AppState>, axum::Router)> {
    let log_format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse::<LogFormat>().ok())
        .unwrap_or_default();
    meridian_infra::init_telemetry(log_format)?;

    tracing::info!(environment = %config.environment, "Configuration loaded and validated");

    let pool = meridian_db::setup_database(config)
        .await
        .context("Database setup failed")?;

    let files = storage::setup_storage(config).await?;

    let state = services::initialize_services(config, pool, files)?;

    let router = routes::setup_routes(config, state.clone())?;

    Ok((state, router))
}
