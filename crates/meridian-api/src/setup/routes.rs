//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Json, Router,
};
use meridian_core::constants::API_PREFIX;
use meridian_core::Config;
use meridian_infra::{request_id_middleware, security_headers_middleware, SecurityHeaders};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api_doc::get_openapi_spec;
use crate::auth::middleware::auth_middleware;
use crate::handlers;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

const DEFAULT_HTTP_CONCURRENCY_LIMIT: usize = 1_000;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_HTTP_CONCURRENCY_LIMIT)
        .max(1);
    tracing::info!(http_concurrency_limit, "HTTP concurrency limit layer enabled");

    let protected = protected_routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    let app = public_routes()
        .merge(protected)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn_with_state(
            SecurityHeaders {
                hsts: config.is_production(),
            },
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            &format!("{}/openapi.json", API_PREFIX),
            get(|| async { Json(get_openapi_spec()) }),
        )
        // Signed links are their own credential.
        .route(
            &format!("{}/files/{{token}}", API_PREFIX),
            get(handlers::files::get_signed_file),
        )
}

fn protected_routes() -> Router<Arc<AppState>> {
    use handlers::{
        activity, archive, clients, history, integrations, meetings, payments, session, users,
    };

    let api = Router::new()
        .route("/session", get(session::get_session))
        .route("/archive/run", post(archive::run_archiver))
        // Meetings
        .route(
            "/meetings",
            get(meetings::list_meetings).post(meetings::create_meeting),
        )
        .route("/meetings/reminders", get(meetings::upcoming_reminders))
        .route(
            "/meetings/{id}",
            get(meetings::get_meeting)
                .patch(meetings::reschedule_meeting)
                .delete(meetings::delete_meeting),
        )
        .route(
            "/meetings/{id}/attachments",
            post(meetings::upload_attachment),
        )
        .route(
            "/meetings/{id}/attachments/url",
            get(meetings::attachment_url),
        )
        // History
        .route("/history", get(history::list_history))
        .route("/history/{id}", get(history::get_history))
        .route("/history/{id}/mom-files", post(history::upload_mom_file))
        .route("/history/{id}/files/url", get(history::history_file_url))
        // Payments
        .route(
            "/payments",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route("/payments/due", get(payments::due_in_month))
        .route(
            "/payments/{id}",
            get(payments::get_payment).delete(payments::delete_payment),
        )
        .route("/payments/{id}/status", put(payments::set_payment_status))
        // Clients
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clients/{id}",
            get(clients::get_client)
                .patch(clients::rename_client)
                .delete(clients::delete_client),
        )
        .route(
            "/clients/{id}/notes",
            get(clients::list_notes).post(clients::add_note),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}/role", put(users::set_role))
        .route("/users/{id}/deactivate", post(users::deactivate_user))
        // Audit and integrations
        .route("/activity", get(activity::list_activity))
        .route(
            "/integrations/{provider}/token",
            get(integrations::token_status).put(integrations::store_token),
        );

    Router::new().nest(API_PREFIX, api)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
