use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use meridian_core::AppError;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Verify the bearer token, resolve it to an active user and store the
/// resulting `ActorContext` in request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(e) => return HttpAppError(e).into_response(),
    };

    let claims = match state.auth.verify(&token) {
        Ok(claims) => claims,
        Err(e) => return HttpAppError(e).into_response(),
    };

    let actor = match state.users.resolve_actor(&claims, Utc::now()).await {
        Ok(actor) => actor,
        Err(e) => {
            tracing::debug!(user_id = %claims.sub, org_id = %claims.org_id, error = %e, "Session rejected");
            return HttpAppError(e).into_response();
        }
    };

    request.extensions_mut().insert(actor);
    next.run(request).await
}

fn bearer_token(request: &Request) -> Result<String, AppError> {
    let header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Invalid authorization header format".to_string())
        })
}
