//! Third-party provider tokens of the signed-in user.
//!
//! Tokens are write-only over HTTP: the status route says whether a usable
//! token is on file without echoing it back.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Actor;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StoreTokenRequest {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenStatusResponse {
    pub provider: String,
    pub connected: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub has_refresh_token: bool,
}

#[utoipa::path(
    put,
    path = "/api/v1/integrations/{provider}/token",
    tag = "integrations",
    params(("provider" = String, Path, description = "Provider name, e.g. google")),
    request_body = StoreTokenRequest,
    responses(
        (status = 204, description = "Token stored encrypted"),
        (status = 400, description = "Empty token or provider", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor, request), fields(user_id = %actor.user_id, provider = %provider))]
pub async fn store_token(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(provider): Path<String>,
    ValidatedJson(request): ValidatedJson<StoreTokenRequest>,
) -> Result<StatusCode, HttpAppError> {
    state
        .oauth
        .store(
            &actor,
            &provider,
            &request.access_token,
            request.refresh_token.as_deref(),
            request.expires_at,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/integrations/{provider}/token",
    tag = "integrations",
    params(("provider" = String, Path, description = "Provider name, e.g. google")),
    responses((status = 200, description = "Connection status", body = TokenStatusResponse)),
    security(("bearer_auth" = []))
)]
pub async fn token_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(provider): Path<String>,
) -> Result<Json<TokenStatusResponse>, HttpAppError> {
    let token = state.oauth.load(&actor, &provider).await?;
    let now = Utc::now();

    let response = match token {
        Some(token) => TokenStatusResponse {
            expired: token.is_expired(now),
            has_refresh_token: token.refresh_token.is_some(),
            expires_at: token.expires_at,
            provider: token.provider,
            connected: true,
        },
        None => TokenStatusResponse {
            provider: provider.trim().to_lowercase(),
            connected: false,
            expires_at: None,
            expired: false,
            has_refresh_token: false,
        },
    };
    Ok(Json(response))
}
