//! Archived meeting routes.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use meridian_core::models::HistoryRecord;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::{ErrorResponse, HttpAppError, ValidatedQuery};
use crate::handlers::uploads::{extract_multipart_file, FilePathQuery, SignedUrlResponse};
use crate::state::AppState;

/// History, newest first. Past meetings are archived before listing.
#[utoipa::path(
    get,
    path = "/api/v1/history",
    tag = "history",
    responses(
        (status = 200, description = "Archived meetings, newest first", body = [HistoryRecord]),
        (status = 401, description = "Missing or expired session", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<HistoryRecord>>, HttpAppError> {
    Ok(Json(state.history.list(&actor).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/history/{id}",
    tag = "history",
    params(("id" = Uuid, Path, description = "History record ID")),
    responses(
        (status = 200, description = "History record", body = HistoryRecord),
        (status = 404, description = "History record not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryRecord>, HttpAppError> {
    Ok(Json(state.history.get(&actor, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/history/{id}/mom-files",
    tag = "history",
    params(("id" = Uuid, Path, description = "History record ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Minutes file stored", body = HistoryRecord),
        (status = 403, description = "Role cannot update history", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor, multipart), fields(history_id = %id))]
pub async fn upload_mom_file(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<HistoryRecord>, HttpAppError> {
    let file = extract_multipart_file(multipart).await?;
    Ok(Json(state.history.add_mom_file(&actor, id, file).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/history/{id}/files/url",
    tag = "history",
    params(("id" = Uuid, Path, description = "History record ID"), FilePathQuery),
    responses(
        (status = 200, description = "Time-limited view URL", body = SignedUrlResponse),
        (status = 404, description = "No such file on this record", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn history_file_url(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ValidatedQuery(query): ValidatedQuery<FilePathQuery>,
) -> Result<Json<SignedUrlResponse>, HttpAppError> {
    let url = state.history.file_url(&actor, id, &query.path).await?;
    Ok(Json(SignedUrlResponse { url }))
}
