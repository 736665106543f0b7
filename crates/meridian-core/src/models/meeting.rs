use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::schedule_time;
use crate::AppError;

/// How the meeting takes place (matches database enum `meeting_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "meeting_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    Online,
    FaceToFace,
    OnCall,
}

/// Alert preference (matches database enum `alert_type`)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "alert_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    #[default]
    None,
    Notify,
    Remind,
}

/// File metadata stored alongside a meeting or history record.
/// The blob itself lives in the storage backend under `storage_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileAttachment {
    pub name: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Active (not yet archived) meeting
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ScheduledMeeting {
    pub id: Uuid,
    pub org_id: Uuid,
    pub client_id: Uuid,
    pub meeting_date: NaiveDate,
    pub meeting_time: NaiveTime,
    pub meeting_type: MeetingType,
    pub location: String,
    pub agenda: Option<String>,
    pub meeting_link: Option<String>,
    pub alert_type: AlertType,
    pub remind_minutes_before: Option<i32>,
    #[schema(value_type = Vec<FileAttachment>)]
    pub attachments: Json<Vec<FileAttachment>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledMeeting {
    pub fn starts_at(&self, tz: Tz) -> DateTime<Utc> {
        schedule_time::meeting_start(self.meeting_date, self.meeting_time, tz)
    }

    /// Reminder instant, when the meeting asks for one.
    pub fn reminder_at(&self, tz: Tz) -> Option<DateTime<Utc>> {
        match (self.alert_type, self.remind_minutes_before) {
            (AlertType::Remind, Some(minutes)) => {
                Some(schedule_time::reminder_instant(self.starts_at(tz), minutes))
            }
            _ => None,
        }
    }

    pub fn has_attachment(&self, storage_path: &str) -> bool {
        self.attachments
            .iter()
            .any(|a| a.storage_path == storage_path)
    }
}

/// Active meeting joined with what archival needs: the client name snapshot
/// and the organisation timezone.
#[derive(Debug, Clone, FromRow)]
pub struct ArchiveCandidate {
    #[sqlx(flatten)]
    pub meeting: ScheduledMeeting,
    pub client_name: String,
    pub org_timezone: String,
}

/// Request DTO for scheduling a meeting
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateMeetingRequest {
    pub client_id: Uuid,
    pub meeting_date: NaiveDate,
    pub meeting_time: NaiveTime,
    pub meeting_type: MeetingType,
    #[validate(length(
        min = 1,
        max = 500,
        message = "location must be between 1 and 500 characters"
    ))]
    pub location: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub agenda: Option<String>,
    #[serde(default)]
    #[validate(url(message = "meeting_link must be a valid URL"))]
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub alert_type: AlertType,
    #[serde(default)]
    #[validate(range(
        min = 1,
        max = 10080,
        message = "remind_minutes_before must be between 1 and 10080"
    ))]
    pub remind_minutes_before: Option<i32>,
}

impl CreateMeetingRequest {
    /// Field validation plus the cross-field reminder rule.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        if self.location.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "location must not be blank".to_string(),
            ));
        }
        if self.alert_type == AlertType::Remind && self.remind_minutes_before.is_none() {
            return Err(AppError::InvalidInput(
                "remind_minutes_before is required when alert_type is 'remind'".to_string(),
            ));
        }
        Ok(())
    }
}

/// Move a meeting to a new date and time. Nothing else changes.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RescheduleMeetingRequest {
    pub meeting_date: NaiveDate,
    pub meeting_time: NaiveTime,
}

/// A meeting whose reminder falls due soon
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpcomingReminder {
    pub meeting_id: Uuid,
    pub client_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub remind_at: DateTime<Utc>,
}
