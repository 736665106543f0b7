//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use meridian_core::Config;
use meridian_infra::ShutdownListener;

/// Serve until the shutdown listener fires, then drain in-flight requests.
pub async fn start_server(config: &Config, app: Router, shutdown: ShutdownListener) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        max_upload_mb = config.max_upload_size_bytes / 1024 / 1024,
        archive_interval_secs = config.archive_interval_secs,
        default_timezone = %config.default_timezone,
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
