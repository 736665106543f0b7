use std::sync::Arc;

use meridian_core::constants::collections;
use meridian_core::models::{
    ActivityAction, CreatePaymentScheduleRequest, DueOccurrence, PaymentSchedule, PaymentStatus,
    SetPaymentStatusRequest,
};
use meridian_core::recurrence::project_one;
use meridian_core::{ActorContext, AppError, MonthWindow, Operation, Resource};
use meridian_db::{ClientStore, PaymentStore};
use uuid::Uuid;

use crate::audit::AuditTrail;
use crate::permit;

#[derive(Clone)]
pub struct PaymentService {
    payments: Arc<dyn PaymentStore>,
    clients: Arc<dyn ClientStore>,
    audit: AuditTrail,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        clients: Arc<dyn ClientStore>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            payments,
            clients,
            audit,
        }
    }

    #[tracing::instrument(skip(self, actor, request), fields(org_id = %actor.org_id, client_id = %request.client_id))]
    pub async fn create(
        &self,
        actor: &ActorContext,
        request: CreatePaymentScheduleRequest,
    ) -> Result<PaymentSchedule, AppError> {
        permit(actor, Resource::Payment, Operation::Create)?;
        request.check()?;

        if self.clients.get(actor.org_id, request.client_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Client {} not found",
                request.client_id
            )));
        }

        let schedule = self
            .payments
            .insert(actor.org_id, actor.user_id, &request)
            .await?;

        self.audit
            .record(
                actor,
                ActivityAction::Create,
                collections::PAYMENT_SCHEDULES,
                schedule.id,
                serde_json::json!({
                    "client_id": schedule.client_id,
                    "frequency": schedule.frequency,
                    "due_dates": schedule.due_dates,
                }),
            )
            .await;

        Ok(schedule)
    }

    pub async fn get(&self, actor: &ActorContext, id: Uuid) -> Result<PaymentSchedule, AppError> {
        permit(actor, Resource::Payment, Operation::Read)?;
        self.find(actor.org_id, id).await
    }

    pub async fn list(
        &self,
        actor: &ActorContext,
        client_id: Option<Uuid>,
    ) -> Result<Vec<PaymentSchedule>, AppError> {
        permit(actor, Resource::Payment, Operation::Read)?;
        self.payments.list(actor.org_id, client_id).await
    }

    /// Every payment falling due in `window`, sorted by date.
    ///
    /// A projected date that is itself a stored due date carries that date's
    /// status; later cycles projected from it read as unpaid.
    pub async fn due_in_month(
        &self,
        actor: &ActorContext,
        window: MonthWindow,
    ) -> Result<Vec<DueOccurrence>, AppError> {
        permit(actor, Resource::Payment, Operation::Read)?;

        let schedules = self.payments.list(actor.org_id, None).await?;
        let mut due: Vec<DueOccurrence> = schedules
            .iter()
            .flat_map(|schedule| occurrences(schedule, window))
            .collect();
        due.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then_with(|| a.client_id.cmp(&b.client_id))
        });

        Ok(due)
    }

    /// Mark one stored due date paid or unpaid.
    #[tracing::instrument(skip(self, actor, request), fields(org_id = %actor.org_id, schedule_id = %id, due_date = %request.due_date))]
    pub async fn set_status(
        &self,
        actor: &ActorContext,
        id: Uuid,
        request: SetPaymentStatusRequest,
    ) -> Result<PaymentSchedule, AppError> {
        permit(actor, Resource::Payment, Operation::Update)?;

        let schedule = self.find(actor.org_id, id).await?;
        if !schedule.has_due_date(request.due_date) {
            return Err(AppError::InvalidInput(format!(
                "{} is not a due date of schedule {}",
                request.due_date, id
            )));
        }

        let updated = self
            .payments
            .set_status(actor.org_id, id, request.due_date, request.status)
            .await?
            .ok_or_else(|| not_found(id))?;

        let mut changed = serde_json::Map::new();
        changed.insert(
            request.due_date.format("%Y-%m-%d").to_string(),
            serde_json::Value::from(request.status.as_str()),
        );
        self.audit
            .record(
                actor,
                ActivityAction::Update,
                collections::PAYMENT_SCHEDULES,
                id,
                serde_json::json!({ "payment_status": changed }),
            )
            .await;

        Ok(updated)
    }

    pub async fn delete(&self, actor: &ActorContext, id: Uuid) -> Result<(), AppError> {
        permit(actor, Resource::Payment, Operation::Delete)?;

        if !self.payments.delete(actor.org_id, id).await? {
            return Err(not_found(id));
        }

        self.audit
            .record(
                actor,
                ActivityAction::Delete,
                collections::PAYMENT_SCHEDULES,
                id,
                serde_json::Value::Null,
            )
            .await;

        Ok(())
    }

    async fn find(&self, org_id: Uuid, id: Uuid) -> Result<PaymentSchedule, AppError> {
        self.payments
            .get(org_id, id)
            .await?
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Payment schedule {} not found", id))
}

fn occurrences(schedule: &PaymentSchedule, window: MonthWindow) -> Vec<DueOccurrence> {
    schedule
        .due_dates
        .iter()
        .enumerate()
        .filter_map(|(index, &source)| {
            let due_date = project_one(source, schedule.frequency, window)?;
            let status = if due_date == source {
                schedule.status_of(source)
            } else {
                PaymentStatus::Unpaid
            };
            Some(DueOccurrence {
                schedule_id: schedule.id,
                client_id: schedule.client_id,
                due_date,
                source_due_date: source,
                frequency: schedule.frequency,
                amount: schedule.amount_for(index),
                status,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{actor, TestServices};
    use chrono::NaiveDate;
    use meridian_core::models::Frequency;
    use meridian_core::Role;
    use rust_decimal::Decimal;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn quarterly(client_id: Uuid) -> CreatePaymentScheduleRequest {
        CreatePaymentScheduleRequest {
            client_id,
            amount: None,
            amounts: Some(vec![Decimal::new(1200, 0)]),
            due_dates: vec![d("2024-01-15")],
            frequency: Frequency::Quarterly,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_due_in_month_projects_quarterly() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let schedule = t.payments.create(&editor, quarterly(client.id)).await.unwrap();

        let april = MonthWindow::new(2024, 4).unwrap();
        let due = t.payments.due_in_month(&editor, april).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].due_date, d("2024-04-15"));
        assert_eq!(due[0].source_due_date, d("2024-01-15"));
        assert_eq!(due[0].schedule_id, schedule.id);
        assert_eq!(due[0].amount, Some(Decimal::new(1200, 0)));

        let february = MonthWindow::new(2024, 2).unwrap();
        assert!(t.payments.due_in_month(&editor, february).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_projected_cycles_read_unpaid() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let schedule = t.payments.create(&editor, quarterly(client.id)).await.unwrap();

        t.payments
            .set_status(
                &editor,
                schedule.id,
                SetPaymentStatusRequest {
                    due_date: d("2024-01-15"),
                    status: PaymentStatus::Paid,
                },
            )
            .await
            .unwrap();

        let january = MonthWindow::new(2024, 1).unwrap();
        let due = t.payments.due_in_month(&editor, january).await.unwrap();
        assert_eq!(due[0].status, PaymentStatus::Paid);

        let april = MonthWindow::new(2024, 4).unwrap();
        let due = t.payments.due_in_month(&editor, april).await.unwrap();
        assert_eq!(due[0].status, PaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_set_status_requires_stored_due_date() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let schedule = t.payments.create(&editor, quarterly(client.id)).await.unwrap();

        let err = t
            .payments
            .set_status(
                &editor,
                schedule.id,
                SetPaymentStatusRequest {
                    due_date: d("2024-04-15"),
                    status: PaymentStatus::Paid,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let viewer = actor(Role::AssociateViewer, t.org_id());
        let err = t
            .payments
            .set_status(
                &viewer,
                schedule.id,
                SetPaymentStatusRequest {
                    due_date: d("2024-01-15"),
                    status: PaymentStatus::Paid,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_status_update_is_audited_with_changed_key() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let schedule = t.payments.create(&editor, quarterly(client.id)).await.unwrap();

        t.payments
            .set_status(
                &editor,
                schedule.id,
                SetPaymentStatusRequest {
                    due_date: d("2024-01-15"),
                    status: PaymentStatus::Paid,
                },
            )
            .await
            .unwrap();

        let last = t.store.activity_entries().pop().unwrap();
        assert_eq!(last.action, ActivityAction::Update);
        assert_eq!(
            last.payload,
            serde_json::json!({ "payment_status": { "2024-01-15": "paid" } })
        );
    }

    #[tokio::test]
    async fn test_invalid_schedule_rejected() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());

        let mut request = quarterly(client.id);
        request.due_dates.push(d("2024-02-15"));
        let err = t.payments.create(&editor, request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_is_manager_only() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let manager = actor(Role::Manager, t.org_id());
        let schedule = t.payments.create(&editor, quarterly(client.id)).await.unwrap();

        assert!(matches!(
            t.payments.delete(&editor, schedule.id).await,
            Err(AppError::Forbidden(_))
        ));
        t.payments.delete(&manager, schedule.id).await.unwrap();
        assert!(matches!(
            t.payments.get(&manager, schedule.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_occurrences_use_positional_amounts() {
        let now = chrono::Utc::now();
        let schedule = PaymentSchedule {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            amount: None,
            amounts: Some(vec![Decimal::new(100, 0), Decimal::new(250, 0)]),
            due_dates: vec![d("2024-03-01"), d("2024-03-20")],
            frequency: Frequency::OneTime,
            payment_status: sqlx::types::Json(Default::default()),
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };

        let march = occurrences(&schedule, MonthWindow::new(2024, 3).unwrap());
        let amounts: Vec<_> = march.iter().map(|o| o.amount).collect();
        assert_eq!(
            amounts,
            vec![Some(Decimal::new(100, 0)), Some(Decimal::new(250, 0))]
        );
    }
}
