use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use meridian_core::models::{ArchiveCandidate, CreateMeetingRequest, FileAttachment, ScheduledMeeting};
use meridian_core::AppError;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::store_traits::MeetingStore;

const MEETING_COLUMNS: &str = "id, org_id, client_id, meeting_date, meeting_time, meeting_type, \
     location, agenda, meeting_link, alert_type, remind_minutes_before, attachments, \
     created_by, created_at, updated_at";

const CANDIDATE_SELECT: &str = r#"
    SELECT m.id, m.org_id, m.client_id, m.meeting_date, m.meeting_time, m.meeting_type,
           m.location, m.agenda, m.meeting_link, m.alert_type, m.remind_minutes_before,
           m.attachments, m.created_by, m.created_at, m.updated_at,
           c.name AS client_name, o.timezone AS org_timezone
    FROM meetings m
    JOIN clients c ON c.id = m.client_id
    JOIN organizations o ON o.id = m.org_id
"#;

/// Repository for active meetings
#[derive(Clone)]
pub struct MeetingRepository {
    pool: PgPool,
}

impl MeetingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MeetingStore for MeetingRepository {
    #[tracing::instrument(skip(self, request), fields(db.table = "meetings", db.operation = "insert"))]
    async fn insert(
        &self,
        org_id: Uuid,
        created_by: Uuid,
        request: &CreateMeetingRequest,
    ) -> Result<ScheduledMeeting, AppError> {
        let query = format!(
            r#"
            INSERT INTO meetings (org_id, client_id, meeting_date, meeting_time, meeting_type,
                                  location, agenda, meeting_link, alert_type,
                                  remind_minutes_before, attachments, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            MEETING_COLUMNS
        );

        let meeting = sqlx::query_as::<Postgres, ScheduledMeeting>(&query)
            .bind(org_id)
            .bind(request.client_id)
            .bind(request.meeting_date)
            .bind(request.meeting_time)
            .bind(request.meeting_type)
            .bind(request.location.trim())
            .bind(&request.agenda)
            .bind(&request.meeting_link)
            .bind(request.alert_type)
            .bind(request.remind_minutes_before)
            .bind(Json(Vec::<FileAttachment>::new()))
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;

        Ok(meeting)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meetings", db.operation = "select", db.record_id = %id))]
    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<ScheduledMeeting>, AppError> {
        let query = format!(
            "SELECT {} FROM meetings WHERE org_id = $1 AND id = $2",
            MEETING_COLUMNS
        );
        let meeting = sqlx::query_as::<Postgres, ScheduledMeeting>(&query)
            .bind(org_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(meeting)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meetings", db.operation = "select"))]
    async fn list_upcoming(&self, org_id: Uuid) -> Result<Vec<ScheduledMeeting>, AppError> {
        let query = format!(
            "SELECT {} FROM meetings WHERE org_id = $1 ORDER BY meeting_date ASC, meeting_time ASC",
            MEETING_COLUMNS
        );
        let meetings = sqlx::query_as::<Postgres, ScheduledMeeting>(&query)
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(meetings)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meetings", db.operation = "select"))]
    async fn list_with_reminders(&self, org_id: Uuid) -> Result<Vec<ScheduledMeeting>, AppError> {
        let query = format!(
            "SELECT {} FROM meetings WHERE org_id = $1 AND alert_type = 'remind' \
             ORDER BY meeting_date ASC, meeting_time ASC",
            MEETING_COLUMNS
        );
        let meetings = sqlx::query_as::<Postgres, ScheduledMeeting>(&query)
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(meetings)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meetings", db.operation = "update", db.record_id = %id))]
    async fn reschedule(
        &self,
        org_id: Uuid,
        id: Uuid,
        meeting_date: NaiveDate,
        meeting_time: NaiveTime,
    ) -> Result<Option<ScheduledMeeting>, AppError> {
        let query = format!(
            r#"
            UPDATE meetings
            SET meeting_date = $3, meeting_time = $4, updated_at = NOW()
            WHERE org_id = $1 AND id = $2
            RETURNING {}
            "#,
            MEETING_COLUMNS
        );
        let meeting = sqlx::query_as::<Postgres, ScheduledMeeting>(&query)
            .bind(org_id)
            .bind(id)
            .bind(meeting_date)
            .bind(meeting_time)
            .fetch_optional(&self.pool)
            .await?;

        Ok(meeting)
    }

    #[tracing::instrument(skip(self, attachment), fields(db.table = "meetings", db.operation = "update", db.record_id = %id))]
    async fn append_attachment(
        &self,
        org_id: Uuid,
        id: Uuid,
        attachment: &FileAttachment,
    ) -> Result<Option<ScheduledMeeting>, AppError> {
        let query = format!(
            r#"
            UPDATE meetings
            SET attachments = attachments || $3::jsonb, updated_at = NOW()
            WHERE org_id = $1 AND id = $2
            RETURNING {}
            "#,
            MEETING_COLUMNS
        );
        let meeting = sqlx::query_as::<Postgres, ScheduledMeeting>(&query)
            .bind(org_id)
            .bind(id)
            .bind(Json(vec![attachment]))
            .fetch_optional(&self.pool)
            .await?;

        Ok(meeting)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meetings", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM meetings WHERE org_id = $1 AND id = $2")
            .bind(org_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meetings", db.operation = "delete", db.record_id = %id))]
    async fn delete_unchanged(
        &self,
        org_id: Uuid,
        id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM meetings WHERE org_id = $1 AND id = $2 AND updated_at = $3",
        )
        .bind(org_id)
        .bind(id)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meetings", db.operation = "select"))]
    async fn count_for_client(&self, org_id: Uuid, client_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM meetings WHERE org_id = $1 AND client_id = $2",
        )
        .bind(org_id)
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meetings", db.operation = "select"))]
    async fn archive_candidates(&self, org_id: Uuid) -> Result<Vec<ArchiveCandidate>, AppError> {
        let query = format!(
            "{} WHERE m.org_id = $1 ORDER BY m.meeting_date ASC, m.meeting_time ASC",
            CANDIDATE_SELECT
        );
        let candidates = sqlx::query_as::<Postgres, ArchiveCandidate>(&query)
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(candidates)
    }

    #[tracing::instrument(skip(self), fields(db.table = "meetings", db.operation = "select"))]
    async fn due_archive_candidates(
        &self,
        on_or_before: NaiveDate,
    ) -> Result<Vec<ArchiveCandidate>, AppError> {
        let query = format!(
            "{} WHERE m.meeting_date <= $1 ORDER BY m.meeting_date ASC, m.meeting_time ASC",
            CANDIDATE_SELECT
        );
        let candidates = sqlx::query_as::<Postgres, ArchiveCandidate>(&query)
            .bind(on_or_before)
            .fetch_all(&self.pool)
            .await?;

        Ok(candidates)
    }
}
