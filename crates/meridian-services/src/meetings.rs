use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use meridian_core::constants::collections;
use meridian_core::models::{
    ActivityAction, CreateMeetingRequest, RescheduleMeetingRequest, ScheduledMeeting,
    UpcomingReminder,
};
use meridian_core::{ActorContext, AppError, Operation, Resource};
use meridian_db::{ClientStore, MeetingStore, OrganizationStore};
use meridian_storage::Storage;
use uuid::Uuid;

use crate::audit::AuditTrail;
use crate::permit;
use crate::settings::ServiceSettings;
use crate::uploads::{remove_blobs, store_then_attach, FileUpload, UploadTarget};

/// Active meeting schedule
#[derive(Clone)]
pub struct MeetingService {
    meetings: Arc<dyn MeetingStore>,
    clients: Arc<dyn ClientStore>,
    organizations: Arc<dyn OrganizationStore>,
    storage: Arc<dyn Storage>,
    audit: AuditTrail,
    settings: ServiceSettings,
}

impl MeetingService {
    pub fn new(
        meetings: Arc<dyn MeetingStore>,
        clients: Arc<dyn ClientStore>,
        organizations: Arc<dyn OrganizationStore>,
        storage: Arc<dyn Storage>,
        audit: AuditTrail,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            meetings,
            clients,
            organizations,
            storage,
            audit,
            settings,
        }
    }

    #[tracing::instrument(skip(self, actor, request), fields(org_id = %actor.org_id, client_id = %request.client_id))]
    pub async fn create(
        &self,
        actor: &ActorContext,
        request: CreateMeetingRequest,
    ) -> Result<ScheduledMeeting, AppError> {
        permit(actor, Resource::Meeting, Operation::Create)?;
        request.check()?;

        if self.clients.get(actor.org_id, request.client_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Client {} not found",
                request.client_id
            )));
        }

        let meeting = self
            .meetings
            .insert(actor.org_id, actor.user_id, &request)
            .await?;

        self.audit
            .record(
                actor,
                ActivityAction::Create,
                collections::MEETINGS,
                meeting.id,
                serde_json::json!({
                    "client_id": meeting.client_id,
                    "meeting_date": meeting.meeting_date,
                    "meeting_time": meeting.meeting_time,
                    "meeting_type": meeting.meeting_type,
                }),
            )
            .await;

        tracing::info!(meeting_id = %meeting.id, "Meeting scheduled");
        Ok(meeting)
    }

    pub async fn get(&self, actor: &ActorContext, id: Uuid) -> Result<ScheduledMeeting, AppError> {
        permit(actor, Resource::Meeting, Operation::Read)?;
        self.find(actor.org_id, id).await
    }

    /// Ordered by date then time.
    pub async fn list_upcoming(&self, actor: &ActorContext) -> Result<Vec<ScheduledMeeting>, AppError> {
        permit(actor, Resource::Meeting, Operation::Read)?;
        self.meetings.list_upcoming(actor.org_id).await
    }

    /// Move a meeting. Only the date and time change.
    #[tracing::instrument(skip(self, actor, request), fields(org_id = %actor.org_id, meeting_id = %id))]
    pub async fn reschedule(
        &self,
        actor: &ActorContext,
        id: Uuid,
        request: RescheduleMeetingRequest,
    ) -> Result<ScheduledMeeting, AppError> {
        permit(actor, Resource::Meeting, Operation::Update)?;

        let meeting = self
            .meetings
            .reschedule(actor.org_id, id, request.meeting_date, request.meeting_time)
            .await?
            .ok_or_else(|| not_found(id))?;

        self.audit
            .record(
                actor,
                ActivityAction::Update,
                collections::MEETINGS,
                id,
                serde_json::json!({
                    "meeting_date": meeting.meeting_date,
                    "meeting_time": meeting.meeting_time,
                }),
            )
            .await;

        Ok(meeting)
    }

    #[tracing::instrument(skip(self, actor, file), fields(org_id = %actor.org_id, meeting_id = %id, file.name = %file.filename))]
    pub async fn add_attachment(
        &self,
        actor: &ActorContext,
        id: Uuid,
        file: FileUpload,
    ) -> Result<ScheduledMeeting, AppError> {
        permit(actor, Resource::Meeting, Operation::Update)?;
        self.find(actor.org_id, id).await?;

        let filename = file.filename.clone();
        let meetings = &self.meetings;
        let org_id = actor.org_id;
        let meeting = store_then_attach(
            self.storage.as_ref(),
            UploadTarget {
                org_id,
                collection: collections::MEETINGS,
                record_id: id,
            },
            file,
            self.settings.max_upload_bytes,
            |attachment| async move { meetings.append_attachment(org_id, id, &attachment).await },
        )
        .await?;

        self.audit
            .record(
                actor,
                ActivityAction::Update,
                collections::MEETINGS,
                id,
                serde_json::json!({ "attachment_added": filename }),
            )
            .await;

        Ok(meeting)
    }

    /// Time-limited URL for one of the meeting's attachments.
    pub async fn attachment_url(
        &self,
        actor: &ActorContext,
        id: Uuid,
        storage_path: &str,
    ) -> Result<String, AppError> {
        permit(actor, Resource::Meeting, Operation::Read)?;

        let meeting = self.find(actor.org_id, id).await?;
        if !meeting.has_attachment(storage_path) {
            return Err(AppError::NotFound(format!(
                "Attachment not found on meeting {}",
                id
            )));
        }

        let url = self
            .storage
            .signed_url(storage_path, self.settings.signed_url_ttl)
            .await?;
        Ok(url)
    }

    /// Cancel a meeting. Fails with NotFound once it has been archived.
    #[tracing::instrument(skip(self, actor), fields(org_id = %actor.org_id, meeting_id = %id))]
    pub async fn delete(&self, actor: &ActorContext, id: Uuid) -> Result<(), AppError> {
        permit(actor, Resource::Meeting, Operation::Delete)?;

        let meeting = self.find(actor.org_id, id).await?;
        if !self.meetings.delete(actor.org_id, id).await? {
            return Err(not_found(id));
        }

        remove_blobs(self.storage.as_ref(), &meeting.attachments).await;

        self.audit
            .record(
                actor,
                ActivityAction::Delete,
                collections::MEETINGS,
                id,
                serde_json::json!({
                    "client_id": meeting.client_id,
                    "meeting_date": meeting.meeting_date,
                    "meeting_time": meeting.meeting_time,
                }),
            )
            .await;

        Ok(())
    }

    /// Meetings whose reminder instant falls in `[now, now + horizon)`,
    /// earliest reminder first.
    pub async fn upcoming_reminders(
        &self,
        actor: &ActorContext,
        now: DateTime<Utc>,
        horizon: Duration,
    ) -> Result<Vec<UpcomingReminder>, AppError> {
        permit(actor, Resource::Meeting, Operation::Read)?;

        let tz = self
            .organizations
            .get(actor.org_id)
            .await?
            .map_or(self.settings.default_timezone, |org| {
                org.tz_or(self.settings.default_timezone)
            });
        let until = now + horizon;

        let mut reminders: Vec<UpcomingReminder> = self
            .meetings
            .list_with_reminders(actor.org_id)
            .await?
            .into_iter()
            .filter_map(|meeting| {
                let remind_at = meeting.reminder_at(tz)?;
                (remind_at >= now && remind_at < until).then(|| UpcomingReminder {
                    meeting_id: meeting.id,
                    client_id: meeting.client_id,
                    starts_at: meeting.starts_at(tz),
                    remind_at,
                })
            })
            .collect();
        reminders.sort_by_key(|r| r.remind_at);

        Ok(reminders)
    }

    async fn find(&self, org_id: Uuid, id: Uuid) -> Result<ScheduledMeeting, AppError> {
        self.meetings
            .get(org_id, id)
            .await?
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Meeting {} not found or already archived", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{actor, TestServices};
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use meridian_core::models::{AlertType, MeetingType};
    use meridian_core::Role;

    fn request(client_id: Uuid) -> CreateMeetingRequest {
        CreateMeetingRequest {
            client_id,
            meeting_date: NaiveDate::from_ymd_opt(2031, 3, 4).unwrap(),
            meeting_time: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            meeting_type: MeetingType::FaceToFace,
            location: "  Head office ".to_string(),
            agenda: Some("Portfolio review".to_string()),
            meeting_link: None,
            alert_type: AlertType::None,
            remind_minutes_before: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_known_client() {
        let t = TestServices::new();
        let editor = actor(Role::AssociateEditor, t.org_id());

        let err = t
            .meetings
            .create(&editor, request(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let client = t.store.seed_client(t.org_id(), "Ravi");
        let meeting = t.meetings.create(&editor, request(client.id)).await.unwrap();
        assert_eq!(meeting.location, "Head office");
        assert_eq!(meeting.created_by, editor.user_id);

        let entries = t.store.activity_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ActivityAction::Create);
        assert_eq!(entries[0].collection, "meetings");
    }

    #[tokio::test]
    async fn test_viewer_cannot_mutate() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let viewer = actor(Role::AssociateViewer, t.org_id());

        let err = t.meetings.create(&viewer, request(client.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(t.store.meetings().is_empty());
        assert!(t.meetings.list_upcoming(&viewer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_manager_only_and_cleans_blobs() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let manager = actor(Role::Manager, t.org_id());
        let meeting = t.meetings.create(&editor, request(client.id)).await.unwrap();

        let with_file = t
            .meetings
            .add_attachment(
                &editor,
                meeting.id,
                FileUpload::new("agenda.pdf", "application/pdf", &b"%PDF-1.7"[..]),
            )
            .await
            .unwrap();
        assert_eq!(with_file.attachments.len(), 1);
        assert_eq!(t.storage.keys().len(), 1);

        let err = t.meetings.delete(&editor, meeting.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        t.meetings.delete(&manager, meeting.id).await.unwrap();
        assert!(t.store.meetings().is_empty());
        assert!(t.storage.keys().is_empty());

        let err = t.meetings.delete(&manager, meeting.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_metadata_update_removes_blob() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let meeting = t.meetings.create(&editor, request(client.id)).await.unwrap();

        t.store.failures().fail_attachment_append(true);
        let result = t
            .meetings
            .add_attachment(
                &editor,
                meeting.id,
                FileUpload::new("notes.txt", "text/plain", &b"hello"[..]),
            )
            .await;

        assert!(result.is_err());
        assert!(t.storage.keys().is_empty());
        assert!(t.store.meetings()[0].attachments.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let t = TestServices::with_settings(ServiceSettings {
            max_upload_bytes: 4,
            ..ServiceSettings::default()
        });
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let meeting = t.meetings.create(&editor, request(client.id)).await.unwrap();

        let err = t
            .meetings
            .add_attachment(
                &editor,
                meeting.id,
                FileUpload::new("big.bin", "application/octet-stream", &b"12345"[..]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert!(t.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_attachment_url_requires_known_path() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let meeting = t.meetings.create(&editor, request(client.id)).await.unwrap();
        let meeting = t
            .meetings
            .add_attachment(
                &editor,
                meeting.id,
                FileUpload::new("a.txt", "text/plain", &b"a"[..]),
            )
            .await
            .unwrap();
        let path = meeting.attachments[0].storage_path.clone();

        let url = t
            .meetings
            .attachment_url(&editor, meeting.id, &path)
            .await
            .unwrap();
        assert!(url.contains(&path));

        let err = t
            .meetings
            .attachment_url(&editor, meeting.id, "orgs/other/meetings/x/y")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reschedule_changes_only_date_and_time() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let meeting = t.meetings.create(&editor, request(client.id)).await.unwrap();

        let moved = t
            .meetings
            .reschedule(
                &editor,
                meeting.id,
                RescheduleMeetingRequest {
                    meeting_date: NaiveDate::from_ymd_opt(2031, 3, 5).unwrap(),
                    meeting_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.meeting_date, NaiveDate::from_ymd_opt(2031, 3, 5).unwrap());
        assert_eq!(moved.location, meeting.location);
        assert_eq!(moved.agenda, meeting.agenda);
    }

    #[tokio::test]
    async fn test_upcoming_reminders_window() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());

        let mut remind = request(client.id);
        remind.alert_type = AlertType::Remind;
        remind.remind_minutes_before = Some(30);
        let meeting = t.meetings.create(&editor, remind).await.unwrap();
        t.meetings.create(&editor, request(client.id)).await.unwrap();

        // Meeting at 15:30 UTC, reminder at 15:00.
        let now = Utc.with_ymd_and_hms(2031, 3, 4, 14, 0, 0).unwrap();
        let due = t
            .meetings
            .upcoming_reminders(&editor, now, Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].meeting_id, meeting.id);
        assert_eq!(due[0].remind_at, Utc.with_ymd_and_hms(2031, 3, 4, 15, 0, 0).unwrap());

        let none = t
            .meetings
            .upcoming_reminders(&editor, now, Duration::minutes(60))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_other_organisation_is_invisible() {
        let t = TestServices::new();
        let client = t.store.seed_client(t.org_id(), "Ravi");
        let editor = actor(Role::AssociateEditor, t.org_id());
        let meeting = t.meetings.create(&editor, request(client.id)).await.unwrap();

        let other_org = t.store.add_org("Elsewhere", "UTC");
        let outsider = actor(Role::Manager, other_org);
        let err = t.meetings.get(&outsider, meeting.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(t.meetings.delete(&outsider, meeting.id).await.is_err());
        assert_eq!(t.store.meetings().len(), 1);
    }
}
