use std::sync::Arc;

use axum::{extract::State, Json};
use meridian_services::ArchiveReport;

use crate::auth::Actor;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/archive/run",
    tag = "history",
    responses(
        (status = 200, description = "Archiver run finished", body = ArchiveReport),
        (status = 401, description = "Missing or expired session", body = ErrorResponse),
        (status = 500, description = "Active meetings could not be listed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor), fields(org_id = %actor.org_id))]
pub async fn run_archiver(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<ArchiveReport>, HttpAppError> {
    let report = state.archiver.archive_past_events(&actor).await?;
    Ok(Json(report))
}
