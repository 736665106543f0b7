use async_trait::async_trait;
use meridian_core::models::{ActivityLogEntry, NewActivityEntry};
use meridian_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::store_traits::ActivityLogStore;

const ACTIVITY_COLUMNS: &str =
    "id, org_id, actor_id, actor_name, action, collection, record_id, payload, created_at";

/// Append-only audit log
#[derive(Clone)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLogStore for ActivityLogRepository {
    #[tracing::instrument(
        skip(self, entry),
        fields(db.table = "activity_log", db.operation = "insert", action = %entry.action)
    )]
    async fn append(&self, entry: &NewActivityEntry) -> Result<ActivityLogEntry, AppError> {
        let query = format!(
            r#"
            INSERT INTO activity_log (org_id, actor_id, actor_name, action, collection, record_id, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ACTIVITY_COLUMNS
        );
        let logged = sqlx::query_as::<Postgres, ActivityLogEntry>(&query)
            .bind(entry.org_id)
            .bind(entry.actor_id)
            .bind(&entry.actor_name)
            .bind(entry.action)
            .bind(&entry.collection)
            .bind(entry.record_id)
            .bind(&entry.payload)
            .fetch_one(&self.pool)
            .await?;

        Ok(logged)
    }

    #[tracing::instrument(skip(self), fields(db.table = "activity_log", db.operation = "select"))]
    async fn list(
        &self,
        org_id: Uuid,
        collection: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ActivityLogEntry>, AppError> {
        let query = format!(
            "SELECT {} FROM activity_log \
             WHERE org_id = $1 AND ($2::text IS NULL OR collection = $2) \
             ORDER BY created_at DESC LIMIT $3",
            ACTIVITY_COLUMNS
        );
        let entries = sqlx::query_as::<Postgres, ActivityLogEntry>(&query)
            .bind(org_id)
            .bind(collection)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }
}
