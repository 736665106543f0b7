//! Meridian worker: archives past meetings for every organisation.
//!
//! Reads the same environment as the API server (`DATABASE_URL`,
//! `ARCHIVE_INTERVAL_SECS`, ...). `run` keeps going until SIGINT/SIGTERM;
//! `once` does a single sweep and exits, which suits an external cron.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use meridian_core::constants::DEFAULT_ARCHIVE_INTERVAL_SECS;
use meridian_core::Config;
use meridian_db::{ActivityLogRepository, HistoryRepository, MeetingRepository};
use meridian_infra::{init_telemetry, LogFormat, ShutdownListener};
use meridian_services::{ArchiverService, AuditTrail};

#[derive(Parser)]
#[command(name = "meridian-worker", about = "Meridian background archiver")]
struct Cli {
    /// Log output format: compact or json
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive on a fixed interval until shut down
    Run {
        /// Seconds between sweeps (defaults to ARCHIVE_INTERVAL_SECS)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Archive everything that is due now, then exit
    Once,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(cli.log_format)?;

    let config = Config::from_env()?;
    let archiver = build_archiver(&config).await?;

    match cli.command {
        Commands::Run { interval_secs } => {
            let secs = interval_secs
                .or_else(|| config.archive_interval().map(|d| d.as_secs()))
                .unwrap_or(DEFAULT_ARCHIVE_INTERVAL_SECS)
                .max(1);

            let shutdown = ShutdownListener::new();
            shutdown.listen_for_signals();

            let handle = archiver.start(Duration::from_secs(secs), shutdown.subscribe());
            handle.await.context("Archiver task panicked")?;
        }
        Commands::Once => {
            let report = archiver.archive_all_due(Utc::now()).await?;
            tracing::info!(
                examined = report.examined,
                archived = report.archived,
                reconciled = report.reconciled,
                failed = report.failed,
                "Archive sweep finished"
            );
            if report.failed > 0 {
                anyhow::bail!("{} meetings failed to archive", report.failed);
            }
        }
    }

    Ok(())
}

async fn build_archiver(config: &Config) -> anyhow::Result<Arc<ArchiverService>> {
    let pool = meridian_db::setup_database(config)
        .await
        .context("Database setup failed")?;

    let audit = AuditTrail::new(Arc::new(ActivityLogRepository::new(pool.clone())));
    Ok(Arc::new(ArchiverService::new(
        Arc::new(MeetingRepository::new(pool.clone())),
        Arc::new(HistoryRepository::new(pool)),
        audit,
        config.default_timezone,
    )))
}
