use async_trait::async_trait;
use chrono::NaiveDate;
use meridian_core::models::{
    CreatePaymentScheduleRequest, PaymentSchedule, PaymentStatus, PaymentStatusMap,
};
use meridian_core::AppError;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::store_traits::PaymentStore;

const PAYMENT_COLUMNS: &str = "id, org_id, client_id, amount, amounts, due_dates, frequency, \
     payment_status, notes, created_by, created_at, updated_at";

/// Repository for payment schedules
#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    #[tracing::instrument(skip(self, request), fields(db.table = "payment_schedules", db.operation = "insert"))]
    async fn insert(
        &self,
        org_id: Uuid,
        created_by: Uuid,
        request: &CreatePaymentScheduleRequest,
    ) -> Result<PaymentSchedule, AppError> {
        let query = format!(
            r#"
            INSERT INTO payment_schedules (org_id, client_id, amount, amounts, due_dates,
                                           frequency, payment_status, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );

        let schedule = sqlx::query_as::<Postgres, PaymentSchedule>(&query)
            .bind(org_id)
            .bind(request.client_id)
            .bind(request.amount)
            .bind(&request.amounts)
            .bind(&request.due_dates)
            .bind(request.frequency)
            .bind(Json(PaymentStatusMap::new()))
            .bind(&request.notes)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;

        Ok(schedule)
    }

    #[tracing::instrument(skip(self), fields(db.table = "payment_schedules", db.operation = "select", db.record_id = %id))]
    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<PaymentSchedule>, AppError> {
        let query = format!(
            "SELECT {} FROM payment_schedules WHERE org_id = $1 AND id = $2",
            PAYMENT_COLUMNS
        );
        let schedule = sqlx::query_as::<Postgres, PaymentSchedule>(&query)
            .bind(org_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(schedule)
    }

    #[tracing::instrument(skip(self), fields(db.table = "payment_schedules", db.operation = "select"))]
    async fn list(
        &self,
        org_id: Uuid,
        client_id: Option<Uuid>,
    ) -> Result<Vec<PaymentSchedule>, AppError> {
        let query = format!(
            "SELECT {} FROM payment_schedules \
             WHERE org_id = $1 AND ($2::uuid IS NULL OR client_id = $2) \
             ORDER BY created_at ASC",
            PAYMENT_COLUMNS
        );
        let schedules = sqlx::query_as::<Postgres, PaymentSchedule>(&query)
            .bind(org_id)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(schedules)
    }

    #[tracing::instrument(skip(self), fields(db.table = "payment_schedules", db.operation = "update", db.record_id = %id))]
    async fn set_status(
        &self,
        org_id: Uuid,
        id: Uuid,
        due_date: NaiveDate,
        status: PaymentStatus,
    ) -> Result<Option<PaymentSchedule>, AppError> {
        // jsonb_set touches one key so concurrent updates to other due dates survive.
        let query = format!(
            r#"
            UPDATE payment_schedules
            SET payment_status = jsonb_set(payment_status, ARRAY[$3::text], to_jsonb($4::text), true),
                updated_at = NOW()
            WHERE org_id = $1 AND id = $2 AND $5::date = ANY(due_dates)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );
        let schedule = sqlx::query_as::<Postgres, PaymentSchedule>(&query)
            .bind(org_id)
            .bind(id)
            .bind(due_date.format("%Y-%m-%d").to_string())
            .bind(status.as_str())
            .bind(due_date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(schedule)
    }

    #[tracing::instrument(skip(self), fields(db.table = "payment_schedules", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM payment_schedules WHERE org_id = $1 AND id = $2")
            .bind(org_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "payment_schedules", db.operation = "select"))]
    async fn count_for_client(&self, org_id: Uuid, client_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM payment_schedules WHERE org_id = $1 AND client_id = $2",
        )
        .bind(org_id)
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
