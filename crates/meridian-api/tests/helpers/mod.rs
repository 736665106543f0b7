//! Test helpers: build AppState and router over in-memory stores.
//!
//! Run with `cargo test -p meridian-api`. No database or Docker needed; every
//! service is wired to the mocks from `meridian-services` (`test-helpers`).

use std::sync::Arc;

use axum_test::TestServer;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use meridian_api::auth::JwtVerifier;
use meridian_api::setup::routes::setup_routes;
use meridian_api::setup::storage::file_url_signer;
use meridian_api::state::{AppState, FileState};
use meridian_core::constants::API_PREFIX;
use meridian_core::models::User;
use meridian_core::{Config, Role, SessionClaims};
use meridian_services::test_helpers::TestServices;
use meridian_storage::Storage;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

pub fn test_config() -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        database_url: "postgresql://unused".to_string(),
        db_max_connections: 1,
        db_timeout_seconds: 1,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        encryption_key: "BwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwc=".to_string(),
        storage_path: "./unused".to_string(),
        storage_base_url: "http://localhost/api/v1/files".to_string(),
        signed_url_ttl_secs: 900,
        max_upload_size_bytes: 1024 * 1024,
        archive_enabled: false,
        archive_interval_secs: 0,
        default_timezone: chrono_tz::UTC,
    }
}

/// Test application: server plus the services and mocks behind it.
pub struct TestApp {
    pub server: TestServer,
    pub services: TestServices,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Seed a user in the default organisation and return it with a bearer header value.
    pub fn login(&self, display_name: &str, role: Role) -> (User, String) {
        let user = self
            .services
            .store
            .seed_user(self.services.org_id(), display_name, role);
        let token = mint_token(&user, Duration::hours(1));
        (user, format!("Bearer {}", token))
    }
}

pub fn mint_token(user: &User, ttl: Duration) -> String {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: user.id,
        org_id: user.org_id,
        role: user.role,
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to encode test token")
}

pub fn setup_test_app() -> TestApp {
    let config = test_config();
    let services = TestServices::new();
    let storage: Arc<dyn Storage> = Arc::new(services.storage.clone());

    let state = Arc::new(AppState {
        auth: JwtVerifier::new(&config.jwt_secret),
        users: services.users.clone(),
        meetings: services.meetings.clone(),
        history: services.history.clone(),
        payments: services.payments.clone(),
        clients: services.clients.clone(),
        oauth: services.oauth.clone(),
        audit: services.audit.clone(),
        archiver: services.archiver.clone(),
        files: FileState {
            storage,
            signer: file_url_signer(&config.jwt_secret),
        },
        max_upload_bytes: config.max_upload_size_bytes,
    });

    let router = setup_routes(&config, state.clone()).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        services,
        state,
    }
}
