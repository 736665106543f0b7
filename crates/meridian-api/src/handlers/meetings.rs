//! Active meeting routes.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use meridian_core::models::{
    CreateMeetingRequest, RescheduleMeetingRequest, ScheduledMeeting, UpcomingReminder,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson, ValidatedQuery};
use crate::handlers::uploads::{extract_multipart_file, FilePathQuery, SignedUrlResponse};
use crate::state::AppState;

const DEFAULT_REMINDER_HORIZON_HOURS: i64 = 24;
const MAX_REMINDER_HORIZON_HOURS: i64 = 24 * 31;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReminderQuery {
    /// Look-ahead window in hours (default 24, at most 744)
    pub hours: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/meetings",
    tag = "meetings",
    responses(
        (status = 200, description = "Active meetings ordered by date and time", body = [ScheduledMeeting]),
        (status = 401, description = "Missing or expired session", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_meetings(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<ScheduledMeeting>>, HttpAppError> {
    Ok(Json(state.meetings.list_upcoming(&actor).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/meetings",
    tag = "meetings",
    request_body = CreateMeetingRequest,
    responses(
        (status = 201, description = "Meeting scheduled", body = ScheduledMeeting),
        (status = 400, description = "Invalid meeting", body = ErrorResponse),
        (status = 403, description = "Role cannot create meetings", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor, request), fields(org_id = %actor.org_id, client_id = %request.client_id))]
pub async fn create_meeting(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedJson(request): ValidatedJson<CreateMeetingRequest>,
) -> Result<(StatusCode, Json<ScheduledMeeting>), HttpAppError> {
    let meeting = state.meetings.create(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

#[utoipa::path(
    get,
    path = "/api/v1/meetings/{id}",
    tag = "meetings",
    params(("id" = Uuid, Path, description = "Meeting ID")),
    responses(
        (status = 200, description = "Meeting", body = ScheduledMeeting),
        (status = 404, description = "Meeting not found or already archived", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduledMeeting>, HttpAppError> {
    Ok(Json(state.meetings.get(&actor, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/meetings/{id}",
    tag = "meetings",
    params(("id" = Uuid, Path, description = "Meeting ID")),
    request_body = RescheduleMeetingRequest,
    responses(
        (status = 200, description = "Meeting rescheduled", body = ScheduledMeeting),
        (status = 403, description = "Role cannot update meetings", body = ErrorResponse),
        (status = 404, description = "Meeting not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor, request), fields(meeting_id = %id))]
pub async fn reschedule_meeting(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RescheduleMeetingRequest>,
) -> Result<Json<ScheduledMeeting>, HttpAppError> {
    Ok(Json(state.meetings.reschedule(&actor, id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/meetings/{id}",
    tag = "meetings",
    params(("id" = Uuid, Path, description = "Meeting ID")),
    responses(
        (status = 204, description = "Meeting deleted"),
        (status = 403, description = "Only managers can delete meetings", body = ErrorResponse),
        (status = 404, description = "Meeting not found or already archived", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor), fields(meeting_id = %id, user_id = %actor.user_id))]
pub async fn delete_meeting(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.meetings.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/meetings/{id}/attachments",
    tag = "meetings",
    params(("id" = Uuid, Path, description = "Meeting ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Attachment stored", body = ScheduledMeeting),
        (status = 400, description = "Missing or empty file", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, actor, multipart), fields(meeting_id = %id))]
pub async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ScheduledMeeting>, HttpAppError> {
    let file = extract_multipart_file(multipart).await?;
    Ok(Json(state.meetings.add_attachment(&actor, id, file).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/meetings/{id}/attachments/url",
    tag = "meetings",
    params(("id" = Uuid, Path, description = "Meeting ID"), FilePathQuery),
    responses(
        (status = 200, description = "Time-limited view URL", body = SignedUrlResponse),
        (status = 404, description = "No such attachment on this meeting", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn attachment_url(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    ValidatedQuery(query): ValidatedQuery<FilePathQuery>,
) -> Result<Json<SignedUrlResponse>, HttpAppError> {
    let url = state.meetings.attachment_url(&actor, id, &query.path).await?;
    Ok(Json(SignedUrlResponse { url }))
}

#[utoipa::path(
    get,
    path = "/api/v1/meetings/reminders",
    tag = "meetings",
    params(ReminderQuery),
    responses(
        (status = 200, description = "Reminders falling due in the window", body = [UpcomingReminder]),
        (status = 400, description = "Invalid window", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upcoming_reminders(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ValidatedQuery(query): ValidatedQuery<ReminderQuery>,
) -> Result<Json<Vec<UpcomingReminder>>, HttpAppError> {
    let hours = query.hours.unwrap_or(DEFAULT_REMINDER_HORIZON_HOURS);
    if !(1..=MAX_REMINDER_HORIZON_HOURS).contains(&hours) {
        return Err(meridian_core::AppError::InvalidInput(format!(
            "hours must be between 1 and {}",
            MAX_REMINDER_HORIZON_HOURS
        ))
        .into());
    }

    let reminders = state
        .meetings
        .upcoming_reminders(&actor, Utc::now(), Duration::hours(hours))
        .await?;
    Ok(Json(reminders))
}
