use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use meridian_core::Role;
use meridian_services::ArchiveReport;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub role: Role,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
    /// Outcome of the archiver run triggered by this bootstrap, when it succeeded
    pub archived: Option<ArchiveReport>,
}

/// Session bootstrap. Also archives past meetings so the schedule the client
/// renders next is clean.
#[utoipa::path(
    get,
    path = "/api/v1/session",
    tag = "session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Missing or expired session", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor), fields(user_id = %actor.user_id, org_id = %actor.org_id))]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<SessionResponse>, HttpAppError> {
    let archived = match state.archiver.archive_past_events(&actor).await {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::warn!(error = %e, "Archiver run at session bootstrap failed");
            None
        }
    };

    let Actor(actor) = actor;
    Ok(Json(SessionResponse {
        user_id: actor.user_id,
        org_id: actor.org_id,
        role: actor.role,
        display_name: actor.display_name,
        expires_at: actor.expires_at,
        archived,
    }))
}
