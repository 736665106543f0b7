use async_trait::async_trait;
use meridian_core::models::{Client, ClientNote, CreateClientRequest};
use meridian_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::store_traits::ClientStore;

const CLIENT_COLUMNS: &str = "id, org_id, name, client_type, created_at, updated_at";
const NOTE_COLUMNS: &str = "id, org_id, client_id, body, created_by, created_by_name, created_at";

/// Repository for clients and their notes
#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientStore for ClientRepository {
    #[tracing::instrument(skip(self, request), fields(db.table = "clients", db.operation = "insert"))]
    async fn insert(&self, org_id: Uuid, request: &CreateClientRequest) -> Result<Client, AppError> {
        let query = format!(
            "INSERT INTO clients (org_id, name, client_type) VALUES ($1, $2, $3) RETURNING {}",
            CLIENT_COLUMNS
        );
        let client = sqlx::query_as::<Postgres, Client>(&query)
            .bind(org_id)
            .bind(request.name.trim())
            .bind(request.client_type)
            .fetch_one(&self.pool)
            .await?;

        Ok(client)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "select", db.record_id = %id))]
    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<Client>, AppError> {
        let query = format!(
            "SELECT {} FROM clients WHERE org_id = $1 AND id = $2",
            CLIENT_COLUMNS
        );
        let client = sqlx::query_as::<Postgres, Client>(&query)
            .bind(org_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "select"))]
    async fn list(&self, org_id: Uuid) -> Result<Vec<Client>, AppError> {
        let query = format!(
            "SELECT {} FROM clients WHERE org_id = $1 ORDER BY name ASC",
            CLIENT_COLUMNS
        );
        let clients = sqlx::query_as::<Postgres, Client>(&query)
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "update", db.record_id = %id))]
    async fn rename(&self, org_id: Uuid, id: Uuid, name: &str) -> Result<Option<Client>, AppError> {
        let query = format!(
            "UPDATE clients SET name = $3, updated_at = NOW() WHERE org_id = $1 AND id = $2 RETURNING {}",
            CLIENT_COLUMNS
        );
        let client = sqlx::query_as::<Postgres, Client>(&query)
            .bind(org_id)
            .bind(id)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE org_id = $1 AND id = $2")
            .bind(org_id)
            .bind(id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            // Meetings and payment schedules hold RESTRICT foreign keys.
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(
                AppError::Conflict("Client is still referenced by meetings or payments".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self, body), fields(db.table = "client_notes", db.operation = "insert"))]
    async fn insert_note(
        &self,
        org_id: Uuid,
        client_id: Uuid,
        created_by: Uuid,
        created_by_name: &str,
        body: &str,
    ) -> Result<ClientNote, AppError> {
        let query = format!(
            r#"
            INSERT INTO client_notes (org_id, client_id, body, created_by, created_by_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            NOTE_COLUMNS
        );
        let note = sqlx::query_as::<Postgres, ClientNote>(&query)
            .bind(org_id)
            .bind(client_id)
            .bind(body)
            .bind(created_by)
            .bind(created_by_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(note)
    }

    #[tracing::instrument(skip(self), fields(db.table = "client_notes", db.operation = "select"))]
    async fn list_notes(&self, org_id: Uuid, client_id: Uuid) -> Result<Vec<ClientNote>, AppError> {
        let query = format!(
            "SELECT {} FROM client_notes WHERE org_id = $1 AND client_id = $2 ORDER BY created_at DESC",
            NOTE_COLUMNS
        );
        let notes = sqlx::query_as::<Postgres, ClientNote>(&query)
            .bind(org_id)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(notes)
    }
}
