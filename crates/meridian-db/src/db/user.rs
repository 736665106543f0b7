use async_trait::async_trait;
use meridian_core::models::{CreateUserRequest, User};
use meridian_core::{AppError, Role};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::store_traits::UserStore;

const USER_COLUMNS: &str =
    "id, org_id, email, display_name, role, is_active, created_at, updated_at";

/// Repository for organisation members
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[tracing::instrument(skip(self, request), fields(db.table = "users", db.operation = "insert"))]
    async fn insert(&self, org_id: Uuid, request: &CreateUserRequest) -> Result<User, AppError> {
        let query = format!(
            "INSERT INTO users (org_id, email, display_name, role) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let result = sqlx::query_as::<Postgres, User>(&query)
            .bind(org_id)
            .bind(request.email.trim().to_lowercase())
            .bind(request.display_name.trim())
            .bind(request.role)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) => {
                let err = AppError::from(e);
                if err.is_unique_violation() {
                    Err(AppError::Conflict(
                        "A user with this email already exists".to_string(),
                    ))
                } else {
                    Err(err)
                }
            }
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE org_id = $1 AND id = $2", USER_COLUMNS);
        let user = sqlx::query_as::<Postgres, User>(&query)
            .bind(org_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn list(&self, org_id: Uuid) -> Result<Vec<User>, AppError> {
        let query = format!(
            "SELECT {} FROM users WHERE org_id = $1 ORDER BY display_name ASC",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<Postgres, User>(&query)
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    async fn set_role(&self, org_id: Uuid, id: Uuid, role: Role) -> Result<Option<User>, AppError> {
        let query = format!(
            "UPDATE users SET role = $3, updated_at = NOW() WHERE org_id = $1 AND id = $2 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<Postgres, User>(&query)
            .bind(org_id)
            .bind(id)
            .bind(role)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    async fn set_active(
        &self,
        org_id: Uuid,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<User>, AppError> {
        let query = format!(
            "UPDATE users SET is_active = $3, updated_at = NOW() WHERE org_id = $1 AND id = $2 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<Postgres, User>(&query)
            .bind(org_id)
            .bind(id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}
