//! Payment schedule routes.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use meridian_core::models::{
    CreatePaymentScheduleRequest, DueOccurrence, PaymentSchedule, SetPaymentStatusRequest,
};
use meridian_core::MonthWindow;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson, ValidatedQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PaymentListQuery {
    /// Only schedules for this client
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DueQuery {
    pub year: i32,
    /// Calendar month, 1 = January
    pub month: u32,
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "payments",
    params(PaymentListQuery),
    responses(
        (status = 200, description = "Payment schedules", body = [PaymentSchedule])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedQuery(query): ValidatedQuery<PaymentListQuery>,
) -> Result<Json<Vec<PaymentSchedule>>, HttpAppError> {
    Ok(Json(state.payments.list(&actor, query.client_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "payments",
    request_body = CreatePaymentScheduleRequest,
    responses(
        (status = 201, description = "Schedule created", body = PaymentSchedule),
        (status = 400, description = "Invalid schedule", body = ErrorResponse),
        (status = 403, description = "Role cannot create schedules", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor, request), fields(org_id = %actor.org_id, client_id = %request.client_id))]
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedJson(request): ValidatedJson<CreatePaymentScheduleRequest>,
) -> Result<(StatusCode, Json<PaymentSchedule>), HttpAppError> {
    let schedule = state.payments.create(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// Occurrences falling due in one calendar month, for the calendar view.
#[utoipa::path(
    get,
    path = "/api/v1/payments/due",
    tag = "payments",
    params(DueQuery),
    responses(
        (status = 200, description = "Occurrences sorted by date", body = [DueOccurrence]),
        (status = 400, description = "Month outside 1..=12", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn due_in_month(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedQuery(query): ValidatedQuery<DueQuery>,
) -> Result<Json<Vec<DueOccurrence>>, HttpAppError> {
    let window = MonthWindow::new(query.year, query.month)?;
    Ok(Json(state.payments.due_in_month(&actor, window).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Payment schedule ID")),
    responses(
        (status = 200, description = "Payment schedule", body = PaymentSchedule),
        (status = 404, description = "Schedule not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentSchedule>, HttpAppError> {
    Ok(Json(state.payments.get(&actor, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/payments/{id}/status",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Payment schedule ID")),
    request_body = SetPaymentStatusRequest,
    responses(
        (status = 200, description = "Status recorded", body = PaymentSchedule),
        (status = 400, description = "Not one of the schedule's due dates", body = ErrorResponse),
        (status = 403, description = "Role cannot update schedules", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor, request), fields(schedule_id = %id, due_date = %request.due_date))]
pub async fn set_payment_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<SetPaymentStatusRequest>,
) -> Result<Json<PaymentSchedule>, HttpAppError> {
    Ok(Json(state.payments.set_status(&actor, id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/payments/{id}",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Payment schedule ID")),
    responses(
        (status = 204, description = "Schedule deleted"),
        (status = 403, description = "Only managers can delete schedules", body = ErrorResponse),
        (status = 404, description = "Schedule not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_payment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.payments.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
