//! Store trait abstractions
//!
//! Services depend on these traits rather than on the Postgres repositories,
//! so they can be exercised against in-memory stores in tests. Every method
//! that reads or writes tenant data takes the `org_id` it is scoped to.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use meridian_core::models::{
    ActivityLogEntry, ArchiveCandidate, Client, ClientNote, CreateClientRequest,
    CreateMeetingRequest, CreatePaymentScheduleRequest, CreateUserRequest, FileAttachment,
    HistoryRecord, InsertOutcome, NewActivityEntry, NewHistoryRecord, OAuthToken, Organization,
    PaymentSchedule, PaymentStatus, ScheduledMeeting, User,
};
use meridian_core::{AppError, Role};
use uuid::Uuid;

#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn insert(
        &self,
        org_id: Uuid,
        created_by: Uuid,
        request: &CreateMeetingRequest,
    ) -> Result<ScheduledMeeting, AppError>;

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<ScheduledMeeting>, AppError>;

    /// Active meetings ordered by date then time.
    async fn list_upcoming(&self, org_id: Uuid) -> Result<Vec<ScheduledMeeting>, AppError>;

    /// Meetings with `alert_type = remind`.
    async fn list_with_reminders(&self, org_id: Uuid) -> Result<Vec<ScheduledMeeting>, AppError>;

    async fn reschedule(
        &self,
        org_id: Uuid,
        id: Uuid,
        meeting_date: NaiveDate,
        meeting_time: NaiveTime,
    ) -> Result<Option<ScheduledMeeting>, AppError>;

    async fn append_attachment(
        &self,
        org_id: Uuid,
        id: Uuid,
        attachment: &FileAttachment,
    ) -> Result<Option<ScheduledMeeting>, AppError>;

    /// Returns false when no active row matched.
    async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// Delete only if the row still carries `updated_at`, i.e. nobody edited it
    /// since it was read. Returns false when no row matched.
    async fn delete_unchanged(
        &self,
        org_id: Uuid,
        id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    async fn count_for_client(&self, org_id: Uuid, client_id: Uuid) -> Result<i64, AppError>;

    /// Every active meeting of the organisation with its archival context.
    async fn archive_candidates(&self, org_id: Uuid) -> Result<Vec<ArchiveCandidate>, AppError>;

    /// Active meetings across all organisations dated on or before `on_or_before`.
    async fn due_archive_candidates(
        &self,
        on_or_before: NaiveDate,
    ) -> Result<Vec<ArchiveCandidate>, AppError>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn find_by_original(
        &self,
        org_id: Uuid,
        original_meeting_id: Uuid,
    ) -> Result<Option<HistoryRecord>, AppError>;

    /// Upsert-or-ignore on `original_meeting_id`.
    async fn insert_if_absent(&self, record: &NewHistoryRecord) -> Result<InsertOutcome, AppError>;

    /// Drop the history row of `original_meeting_id`; false when there was none.
    async fn remove_by_original(
        &self,
        org_id: Uuid,
        original_meeting_id: Uuid,
    ) -> Result<bool, AppError>;

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<HistoryRecord>, AppError>;

    /// Newest meetings first.
    async fn list(&self, org_id: Uuid) -> Result<Vec<HistoryRecord>, AppError>;

    async fn append_mom_file(
        &self,
        org_id: Uuid,
        id: Uuid,
        file: &FileAttachment,
    ) -> Result<Option<HistoryRecord>, AppError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(
        &self,
        org_id: Uuid,
        created_by: Uuid,
        request: &CreatePaymentScheduleRequest,
    ) -> Result<PaymentSchedule, AppError>;

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<PaymentSchedule>, AppError>;

    async fn list(
        &self,
        org_id: Uuid,
        client_id: Option<Uuid>,
    ) -> Result<Vec<PaymentSchedule>, AppError>;

    /// Set the status of one due date, leaving every other key untouched.
    async fn set_status(
        &self,
        org_id: Uuid,
        id: Uuid,
        due_date: NaiveDate,
        status: PaymentStatus,
    ) -> Result<Option<PaymentSchedule>, AppError>;

    async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    async fn count_for_client(&self, org_id: Uuid, client_id: Uuid) -> Result<i64, AppError>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn insert(&self, org_id: Uuid, request: &CreateClientRequest) -> Result<Client, AppError>;

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<Client>, AppError>;

    async fn list(&self, org_id: Uuid) -> Result<Vec<Client>, AppError>;

    async fn rename(&self, org_id: Uuid, id: Uuid, name: &str) -> Result<Option<Client>, AppError>;

    async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    async fn insert_note(
        &self,
        org_id: Uuid,
        client_id: Uuid,
        created_by: Uuid,
        created_by_name: &str,
        body: &str,
    ) -> Result<ClientNote, AppError>;

    /// Newest first.
    async fn list_notes(&self, org_id: Uuid, client_id: Uuid) -> Result<Vec<ClientNote>, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, org_id: Uuid, request: &CreateUserRequest) -> Result<User, AppError>;

    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<User>, AppError>;

    async fn list(&self, org_id: Uuid) -> Result<Vec<User>, AppError>;

    async fn set_role(&self, org_id: Uuid, id: Uuid, role: Role) -> Result<Option<User>, AppError>;

    async fn set_active(
        &self,
        org_id: Uuid,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Organization>, AppError>;
}

#[async_trait]
pub trait ActivityLogStore: Send + Sync {
    async fn append(&self, entry: &NewActivityEntry) -> Result<ActivityLogEntry, AppError>;

    /// Newest first, optionally restricted to one collection.
    async fn list(
        &self,
        org_id: Uuid,
        collection: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ActivityLogEntry>, AppError>;
}

#[async_trait]
pub trait OAuthTokenStore: Send + Sync {
    /// Insert or replace the token pair for `(user_id, provider)`.
    async fn upsert(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        provider: &str,
        access_token_encrypted: &str,
        refresh_token_encrypted: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<OAuthToken, AppError>;

    async fn get(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<OAuthToken>, AppError>;
}
