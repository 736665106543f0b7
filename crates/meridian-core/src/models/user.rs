use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::policy::Role;

/// Organisation member. Credentials live with the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub org_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for adding a user to the organisation
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "display_name must be between 1 and 255 characters"
    ))]
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    pub role: Role,
}
