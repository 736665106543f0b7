//! Activity log writer shared by every service.

use std::sync::Arc;

use meridian_core::models::{ActivityAction, ActivityLogEntry, NewActivityEntry};
use meridian_core::{ActorContext, AppError, Operation, Resource};
use meridian_db::ActivityLogStore;
use uuid::Uuid;

use crate::permit;

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn ActivityLogStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn ActivityLogStore>) -> Self {
        Self { store }
    }

    /// Record a completed mutation.
    ///
    /// The mutation has already been committed when this runs, so a failed
    /// write is logged and swallowed.
    pub async fn record(
        &self,
        actor: &ActorContext,
        action: ActivityAction,
        collection: &str,
        record_id: Uuid,
        payload: serde_json::Value,
    ) {
        let entry = NewActivityEntry {
            org_id: actor.org_id,
            actor_id: actor.actor_id(),
            actor_name: actor.display_name.clone(),
            action,
            collection: collection.to_string(),
            record_id,
            payload,
        };

        if let Err(e) = self.store.append(&entry).await {
            tracing::error!(
                error = %e,
                org_id = %actor.org_id,
                action = %action,
                collection = %collection,
                record_id = %record_id,
                "Failed to write activity log entry"
            );
        }
    }

    /// Newest entries first. Managers only.
    pub async fn list(
        &self,
        actor: &ActorContext,
        collection: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<ActivityLogEntry>, AppError> {
        permit(actor, Resource::ActivityLog, Operation::Read)?;

        let limit = limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        self.store.list(actor.org_id, collection, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{actor, MockStore};
    use meridian_core::Role;

    #[tokio::test]
    async fn test_record_and_list() {
        let store = MockStore::new();
        let audit = AuditTrail::new(Arc::new(store.clone()));
        let manager = actor(Role::Manager, store.org_id());

        let record_id = Uuid::new_v4();
        audit
            .record(
                &manager,
                ActivityAction::Create,
                "clients",
                record_id,
                serde_json::json!({ "name": "Ravi" }),
            )
            .await;

        let entries = audit.list(&manager, Some("clients"), None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record_id, record_id);
        assert_eq!(entries[0].actor_id, Some(manager.user_id));
        assert!(audit
            .list(&manager, Some("meetings"), None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let store = MockStore::new();
        store.failures().fail_activity_append(true);
        let audit = AuditTrail::new(Arc::new(store.clone()));
        let manager = actor(Role::Manager, store.org_id());

        audit
            .record(
                &manager,
                ActivityAction::Delete,
                "clients",
                Uuid::new_v4(),
                serde_json::Value::Null,
            )
            .await;

        assert!(store.activity_entries().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_manager_only() {
        let store = MockStore::new();
        let audit = AuditTrail::new(Arc::new(store.clone()));

        for role in [Role::AssociateEditor, Role::AssociateViewer] {
            let err = audit
                .list(&actor(role, store.org_id()), None, None)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }
    }
}
