use std::sync::Arc;

use axum::{extract::State, Json};
use meridian_core::models::ActivityLogEntry;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::Actor;
use crate::error::{ErrorResponse, HttpAppError, ValidatedQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ActivityQuery {
    /// Only entries for this collection (e.g. `meetings`)
    pub collection: Option<String>,
    /// Maximum entries to return (default 100, at most 500)
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/activity",
    tag = "activity",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Audit entries, newest first", body = [ActivityLogEntry]),
        (status = 403, description = "Only managers can read the activity log", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_activity(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedQuery(query): ValidatedQuery<ActivityQuery>,
) -> Result<Json<Vec<ActivityLogEntry>>, HttpAppError> {
    let entries = state
        .audit
        .list(&actor, query.collection.as_deref(), query.limit)
        .await?;
    Ok(Json(entries))
}
