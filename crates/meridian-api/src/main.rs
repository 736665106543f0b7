use meridian_core::Config;
use meridian_infra::ShutdownListener;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Initialize the application (database, storage, services, routes)
    let (state, router) = meridian_api::setup::initialize_app(&config).await?;

    let shutdown = ShutdownListener::new();
    shutdown.listen_for_signals();

    let archiver = config.archive_interval().map(|period| {
        state
            .archiver
            .clone()
            .start(period, shutdown.subscribe())
    });
    if archiver.is_none() {
        tracing::info!("Background archiver disabled");
    }

    meridian_api::setup::server::start_server(&config, router, shutdown.clone()).await?;

    // Stop the archiver even if the server returned without a signal.
    shutdown.trigger();
    if let Some(handle) = archiver {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Archiver task panicked");
        }
    }

    Ok(())
}
