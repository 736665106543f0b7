//! Service initialization and application state setup

use std::sync::Arc;

use anyhow::{Context, Result};
use meridian_core::{Config, EncryptionService};
use meridian_db::{
    ActivityLogRepository, ClientRepository, HistoryRepository, MeetingRepository,
    OAuthTokenRepository, OrganizationRepository, PaymentRepository, UserRepository,
};
use meridian_services::{
    ArchiverService, AuditTrail, ClientService, HistoryService, MeetingService,
    OAuthTokenService, PaymentService, ServiceSettings, UserService,
};
use sqlx::PgPool;

use crate::auth::JwtVerifier;
use crate::state::{AppState, FileState};

/// Wire repositories into services and build the application state.
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    files: FileState,
) -> Result<Arc<AppState>> {
    let settings = ServiceSettings::from_config(config);
    let encryption = Arc::new(
        EncryptionService::from_base64_key(&config.encryption_key)
            .context("ENCRYPTION_KEY must be a base64-encoded 32-byte key")?,
    );

    let meetings = Arc::new(MeetingRepository::new(pool.clone()));
    let history = Arc::new(HistoryRepository::new(pool.clone()));
    let payments = Arc::new(PaymentRepository::new(pool.clone()));
    let clients = Arc::new(ClientRepository::new(pool.clone()));
    let users = Arc::new(UserRepository::new(pool.clone()));
    let organizations = Arc::new(OrganizationRepository::new(pool.clone()));
    let tokens = Arc::new(OAuthTokenRepository::new(pool.clone()));
    let activity = Arc::new(ActivityLogRepository::new(pool));

    let audit = AuditTrail::new(activity);
    let archiver = Arc::new(ArchiverService::new(
        meetings.clone(),
        history.clone(),
        audit.clone(),
        settings.default_timezone,
    ));

    let state = AppState {
        auth: JwtVerifier::new(&config.jwt_secret),
        users: UserService::new(users, audit.clone()),
        meetings: MeetingService::new(
            meetings.clone(),
            clients.clone(),
            organizations,
            files.storage.clone(),
            audit.clone(),
            settings.clone(),
        ),
        history: HistoryService::new(
            history,
            archiver.clone(),
            files.storage.clone(),
            audit.clone(),
            settings.clone(),
        ),
        payments: PaymentService::new(payments.clone(), clients.clone(), audit.clone()),
        clients: ClientService::new(clients, meetings, payments, audit.clone()),
        oauth: OAuthTokenService::new(tokens, encryption),
        audit,
        archiver,
        files,
        max_upload_bytes: settings.max_upload_bytes,
    };

    tracing::info!("Services initialized");
    Ok(Arc::new(state))
}
