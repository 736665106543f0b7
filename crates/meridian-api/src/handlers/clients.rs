//! Client and client note routes.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use meridian_core::models::{
    Client, ClientNote, CreateClientNoteRequest, CreateClientRequest, RenameClientRequest,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/clients",
    tag = "clients",
    responses((status = 200, description = "Clients", body = [Client])),
    security(("bearer_auth" = []))
)]
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<Client>>, HttpAppError> {
    Ok(Json(state.clients.list(&actor).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/clients",
    tag = "clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = Client),
        (status = 400, description = "Invalid client", body = ErrorResponse),
        (status = 403, description = "Role cannot create clients", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedJson(request): ValidatedJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), HttpAppError> {
    let client = state.clients.create(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client", body = Client),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, HttpAppError> {
    Ok(Json(state.clients.get(&actor, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/clients/{id}",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    request_body = RenameClientRequest,
    responses(
        (status = 200, description = "Client renamed", body = Client),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn rename_client(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RenameClientRequest>,
) -> Result<Json<Client>, HttpAppError> {
    Ok(Json(state.clients.rename(&actor, id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 403, description = "Only managers can delete clients", body = ErrorResponse),
        (status = 409, description = "Client still has meetings or payment schedules", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor), fields(client_id = %id))]
pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.clients.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}/notes",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Notes, newest first", body = [ClientNote]),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ClientNote>>, HttpAppError> {
    Ok(Json(state.clients.list_notes(&actor, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/clients/{id}/notes",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    request_body = CreateClientNoteRequest,
    responses(
        (status = 201, description = "Note added", body = ClientNote),
        (status = 400, description = "Empty note", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_note(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateClientNoteRequest>,
) -> Result<(StatusCode, Json<ClientNote>), HttpAppError> {
    let note = state.clients.add_note(&actor, id, request).await?;
    Ok((StatusCode::CREATED, Json(note)))
}
