//! Signed file route: serves a stored attachment or minutes file by token (no session).

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use chrono::Utc;
use meridian_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::uploads::content_type_for_key;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/files/{token}",
    tag = "files",
    params(("token" = String, Path, description = "Signed token from a file URL route")),
    responses(
        (status = 200, description = "File contents"),
        (status = 401, description = "Invalid or expired link", body = ErrorResponse),
        (status = 404, description = "File no longer stored", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, token), fields(operation = "get_signed_file"))]
pub async fn get_signed_file(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, HttpAppError> {
    let storage_key = state.files.signer.verify(token.trim(), Utc::now())?;

    let data = state.files.storage.download(&storage_key).await.map_err(|e| {
        tracing::debug!(error = %e, storage_key = %storage_key, "Failed to read signed file");
        HttpAppError::from(e)
    })?;

    let filename = storage_key.rsplit('/').next().unwrap_or("file").replace('"', "");
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for_key(&storage_key))
        .header(header::CONTENT_DISPOSITION, format!("inline; filename=\"{}\"", filename))
        .header(header::CACHE_CONTROL, "private, max-age=300")
        .body(Body::from(data))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}
