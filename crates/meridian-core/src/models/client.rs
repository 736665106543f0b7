use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Client category (matches database enum `client_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "client_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    MutualFunds,
    Holistic,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Client {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub client_type: ClientType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a client
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateClientRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Client name must be between 1 and 255 characters"
    ))]
    pub name: String,
    pub client_type: ClientType,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RenameClientRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Client name must be between 1 and 255 characters"
    ))]
    pub name: String,
}

/// Free-text note attached to a client
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ClientNote {
    pub id: Uuid,
    pub org_id: Uuid,
    pub client_id: Uuid,
    pub body: String,
    pub created_by: Uuid,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateClientNoteRequest {
    #[validate(length(
        min = 1,
        max = 10000,
        message = "Note must be between 1 and 10000 characters"
    ))]
    pub body: String,
}
