use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::meeting::{ArchiveCandidate, FileAttachment, MeetingType};

/// Immutable archival copy of a meeting whose start has passed.
/// At most one exists per `original_meeting_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub original_meeting_id: Uuid,
    /// Cleared if the client is later removed; `client_name` keeps the snapshot.
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub meeting_date: NaiveDate,
    pub meeting_time: NaiveTime,
    pub meeting_type: MeetingType,
    pub location: String,
    pub agenda: Option<String>,
    pub meeting_link: Option<String>,
    #[schema(value_type = Vec<FileAttachment>)]
    pub attachments: Json<Vec<FileAttachment>>,
    /// Minutes-of-meeting files, only ever attached after archival
    #[schema(value_type = Vec<FileAttachment>)]
    pub mom_files: Json<Vec<FileAttachment>>,
    pub created_by: Uuid,
    pub archived_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn has_file(&self, storage_path: &str) -> bool {
        self.attachments
            .iter()
            .chain(self.mom_files.iter())
            .any(|f| f.storage_path == storage_path)
    }
}

/// History row to insert for an archived meeting.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryRecord {
    pub org_id: Uuid,
    pub original_meeting_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub meeting_date: NaiveDate,
    pub meeting_time: NaiveTime,
    pub meeting_type: MeetingType,
    pub location: String,
    pub agenda: Option<String>,
    pub meeting_link: Option<String>,
    pub attachments: Vec<FileAttachment>,
    pub created_by: Uuid,
}

impl From<&ArchiveCandidate> for NewHistoryRecord {
    fn from(candidate: &ArchiveCandidate) -> Self {
        let m = &candidate.meeting;
        NewHistoryRecord {
            org_id: m.org_id,
            original_meeting_id: m.id,
            client_id: m.client_id,
            client_name: candidate.client_name.clone(),
            meeting_date: m.meeting_date,
            meeting_time: m.meeting_time,
            meeting_type: m.meeting_type,
            location: m.location.clone(),
            agenda: m.agenda.clone(),
            meeting_link: m.meeting_link.clone(),
            attachments: m.attachments.0.clone(),
            created_by: m.created_by,
        }
    }
}

/// Result of inserting a history row with upsert-or-ignore semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row for the same `original_meeting_id` already existed.
    AlreadyArchived,
}
