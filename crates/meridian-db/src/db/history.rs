use async_trait::async_trait;
use meridian_core::models::{FileAttachment, HistoryRecord, InsertOutcome, NewHistoryRecord};
use meridian_core::AppError;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::store_traits::HistoryStore;

const HISTORY_COLUMNS: &str = "id, org_id, original_meeting_id, client_id, client_name, \
     meeting_date, meeting_time, meeting_type, location, agenda, meeting_link, attachments, \
     mom_files, created_by, archived_at";

/// Repository for archived meetings
#[derive(Clone)]
pub struct HistoryRepository {
    pool: PgPool,
}

impl HistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for HistoryRepository {
    #[tracing::instrument(skip(self), fields(db.table = "meeting_history", db.operation = "select"))]
    async fn find_by_original(
        &self,
        org_id: Uuid,
        original_meeting_id: Uuid,
    ) -> Result<Option<HistoryRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM meeting_history WHERE org_id = $1 AND original_meeting_id = $2",
            HISTORY_COLUMNS
        );
        let record = sqlx::query_as::<Postgres, HistoryRecord>(&query)
            .bind(org_id)
            .bind(original_meeting_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(
        skip(self, record),
        fields(
            db.table = "meeting_history",
            db.operation = "insert",
            meeting_id = %record.original_meeting_id
        )
    )]
    async fn insert_if_absent(&self, record: &NewHistoryRecord) -> Result<InsertOutcome, AppError> {
        // The unique index on original_meeting_id makes a concurrent archiver's
        // insert a no-op instead of a duplicate.
        let inserted = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO meeting_history (org_id, original_meeting_id, client_id, client_name,
                                         meeting_date, meeting_time, meeting_type, location,
                                         agenda, meeting_link, attachments, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (original_meeting_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(record.org_id)
        .bind(record.original_meeting_id)
        .bind(record.client_id)
        .bind(&record.client_name)
        .bind(record.meeting_date)
        .bind(record.meeting_time)
        .bind(record.meeting_type)
        .bind(&record.location)
        .bind(&record.agenda)
        .bind(&record.meeting_link)
        .bind(Json(&record.attachments))
        .bind(record.created_by)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match inserted {
            Some(_) => InsertOutcome::Inserted,
            None => InsertOutcome::AlreadyArchived,
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "meeting_history", db.operation = "delete"))]
    async fn remove_by_original(
        &self,
        org_id: Uuid,
        original_meeting_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM meeting_history WHERE org_id = $1 AND original_meeting_id = $2",
        )
        .bind(org_id)
        .bind(original_meeting_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meeting_history", db.operation = "select", db.record_id = %id))]
    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<HistoryRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM meeting_history WHERE org_id = $1 AND id = $2",
            HISTORY_COLUMNS
        );
        let record = sqlx::query_as::<Postgres, HistoryRecord>(&query)
            .bind(org_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meeting_history", db.operation = "select"))]
    async fn list(&self, org_id: Uuid) -> Result<Vec<HistoryRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM meeting_history WHERE org_id = $1 \
             ORDER BY meeting_date DESC, meeting_time DESC",
            HISTORY_COLUMNS
        );
        let records = sqlx::query_as::<Postgres, HistoryRecord>(&query)
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self, file), fields(db.table = "meeting_history", db.operation = "update", db.record_id = %id))]
    async fn append_mom_file(
        &self,
        org_id: Uuid,
        id: Uuid,
        file: &FileAttachment,
    ) -> Result<Option<HistoryRecord>, AppError> {
        let query = format!(
            r#"
            UPDATE meeting_history
            SET mom_files = mom_files || $3::jsonb
            WHERE org_id = $1 AND id = $2
            RETURNING {}
            "#,
            HISTORY_COLUMNS
        );
        let record = sqlx::query_as::<Postgres, HistoryRecord>(&query)
            .bind(org_id)
            .bind(id)
            .bind(Json(vec![file]))
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }
}
