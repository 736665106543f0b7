use std::sync::Arc;

use meridian_core::constants::collections;
use meridian_core::models::{ActivityAction, HistoryRecord};
use meridian_core::{ActorContext, AppError, Operation, Resource};
use meridian_db::HistoryStore;
use meridian_storage::Storage;
use uuid::Uuid;

use crate::archiver::ArchiverService;
use crate::audit::AuditTrail;
use crate::permit;
use crate::settings::ServiceSettings;
use crate::uploads::{store_then_attach, FileUpload, UploadTarget};

/// Read access to archived meetings plus minutes-of-meeting uploads.
#[derive(Clone)]
pub struct HistoryService {
    history: Arc<dyn HistoryStore>,
    archiver: Arc<ArchiverService>,
    storage: Arc<dyn Storage>,
    audit: AuditTrail,
    settings: ServiceSettings,
}

impl HistoryService {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        archiver: Arc<ArchiverService>,
        storage: Arc<dyn Storage>,
        audit: AuditTrail,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            history,
            archiver,
            storage,
            audit,
            settings,
        }
    }

    /// Newest meetings first. Archives anything that has just become past
    /// before listing; an archiver failure does not fail the listing.
    pub async fn list(&self, actor: &ActorContext) -> Result<Vec<HistoryRecord>, AppError> {
        permit(actor, Resource::History, Operation::Read)?;

        if let Err(e) = self.archiver.archive_past_events(actor).await {
            tracing::warn!(error = %e, org_id = %actor.org_id, "Archive before history listing failed");
        }

        self.history.list(actor.org_id).await
    }

    pub async fn get(&self, actor: &ActorContext, id: Uuid) -> Result<HistoryRecord, AppError> {
        permit(actor, Resource::History, Operation::Read)?;
        self.find(actor.org_id, id).await
    }

    #[tracing::instrument(skip(self, actor, file), fields(org_id = %actor.org_id, history_id = %id, file.name = %file.filename))]
    pub async fn add_mom_file(
        &self,
        actor: &ActorContext,
        id: Uuid,
        file: FileUpload,
    ) -> Result<HistoryRecord, AppError> {
        permit(actor, Resource::History, Operation::Update)?;
        self.find(actor.org_id, id).await?;

        let filename = file.filename.clone();
        let history = &self.history;
        let org_id = actor.org_id;
        let record = store_then_attach(
            self.storage.as_ref(),
            UploadTarget {
                org_id,
                collection: collections::MEETING_HISTORY,
                record_id: id,
            },
            file,
            self.settings.max_upload_bytes,
            |attachment| async move { history.append_mom_file(org_id, id, &attachment).await },
        )
        .await?;

        self.audit
            .record(
                actor,
                ActivityAction::Update,
                collections::MEETING_HISTORY,
                id,
                serde_json::json!({ "mom_file_added": filename }),
            )
            .await;

        Ok(record)
    }

    /// Signed URL for an attachment or MOM file of an archived meeting.
    pub async fn file_url(
        &self,
        actor: &ActorContext,
        id: Uuid,
        storage_path: &str,
    ) -> Result<String, AppError> {
        permit(actor, Resource::History, Operation::Read)?;

        let record = self.find(actor.org_id, id).await?;
        if !record.has_file(storage_path) {
            return Err(AppError::NotFound(format!(
                "File not found on history record {}",
                id
            )));
        }

        Ok(self
            .storage
            .signed_url(storage_path, self.settings.signed_url_ttl)
            .await?)
    }

    async fn find(&self, org_id: Uuid, id: Uuid) -> Result<HistoryRecord, AppError> {
        self.history
            .get(org_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("History record {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{actor, TestServices};
    use chrono::{NaiveDate, NaiveTime};
    use meridian_core::Role;

    fn past_meeting(t: &TestServices) {
        let client = t.store.seed_client(t.org_id(), "Ravi");
        t.store.seed_meeting(
            t.org_id(),
            client.id,
            NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        );
    }

    #[tokio::test]
    async fn test_list_archives_first() {
        let t = TestServices::new();
        past_meeting(&t);
        let viewer = actor(Role::AssociateViewer, t.org_id());

        let records = t.history.list(&viewer).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(t.store.meetings().is_empty());
    }

    #[tokio::test]
    async fn test_list_survives_archiver_failure() {
        let t = TestServices::new();
        past_meeting(&t);
        t.store.failures().fail_history_insert(true);
        let viewer = actor(Role::AssociateViewer, t.org_id());

        let records = t.history.list(&viewer).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(t.store.meetings().len(), 1);
    }

    #[tokio::test]
    async fn test_mom_upload_and_url() {
        let t = TestServices::new();
        past_meeting(&t);
        let editor = actor(Role::AssociateEditor, t.org_id());
        let viewer = actor(Role::AssociateViewer, t.org_id());
        let record = t.history.list(&editor).await.unwrap().remove(0);

        let upload = || FileUpload::new("minutes.md", "text/markdown", &b"# Minutes"[..]);
        let err = t
            .history
            .add_mom_file(&viewer, record.id, upload())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = t.history.add_mom_file(&editor, record.id, upload()).await.unwrap();
        assert_eq!(updated.mom_files.len(), 1);
        assert!(updated.mom_files[0].storage_path.contains("/meeting_history/"));

        let url = t
            .history
            .file_url(&viewer, record.id, &updated.mom_files[0].storage_path)
            .await
            .unwrap();
        assert!(url.starts_with("mock://"));
    }

    #[tokio::test]
    async fn test_mom_upload_compensates_on_failure() {
        let t = TestServices::new();
        past_meeting(&t);
        let editor = actor(Role::AssociateEditor, t.org_id());
        let record = t.history.list(&editor).await.unwrap().remove(0);

        t.store.failures().fail_attachment_append(true);
        let result = t
            .history
            .add_mom_file(
                &editor,
                record.id,
                FileUpload::new("minutes.md", "text/markdown", &b"# Minutes"[..]),
            )
            .await;
        assert!(result.is_err());
        assert!(t.storage.keys().is_empty());
    }
}
