use std::sync::Arc;

use chrono::{Duration, Utc};
use meridian_core::{ActorContext, EncryptionService, Role};
use uuid::Uuid;

use super::{MockStorage, MockStore};
use crate::{
    ArchiverService, AuditTrail, ClientService, HistoryService, MeetingService,
    OAuthTokenService, PaymentService, ServiceSettings, UserService,
};

/// An actor with a fresh user id and an hour of session left.
pub fn actor(role: Role, org_id: Uuid) -> ActorContext {
    ActorContext {
        user_id: Uuid::new_v4(),
        org_id,
        role,
        display_name: format!("Test {}", role),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

/// Every service wired to one [`MockStore`] and one [`MockStorage`].
#[derive(Clone)]
pub struct TestServices {
    pub store: MockStore,
    pub storage: MockStorage,
    pub audit: AuditTrail,
    pub archiver: Arc<ArchiverService>,
    pub meetings: MeetingService,
    pub history: HistoryService,
    pub payments: PaymentService,
    pub clients: ClientService,
    pub users: UserService,
    pub oauth: OAuthTokenService,
}

impl Default for TestServices {
    fn default() -> Self {
        Self::new()
    }
}

impl TestServices {
    pub fn new() -> Self {
        Self::with_settings(ServiceSettings::default())
    }

    pub fn with_settings(settings: ServiceSettings) -> Self {
        let store = MockStore::new();
        let storage = MockStorage::new();
        let shared = Arc::new(store.clone());
        let blobs = Arc::new(storage.clone());

        let audit = AuditTrail::new(shared.clone());
        let archiver = Arc::new(ArchiverService::new(
            shared.clone(),
            shared.clone(),
            audit.clone(),
            settings.default_timezone,
        ));
        let encryption = Arc::new(
            EncryptionService::from_key_bytes(&[7u8; 32]).expect("valid test key"),
        );

        Self {
            meetings: MeetingService::new(
                shared.clone(),
                shared.clone(),
                shared.clone(),
                blobs.clone(),
                audit.clone(),
                settings.clone(),
            ),
            history: HistoryService::new(
                shared.clone(),
                archiver.clone(),
                blobs,
                audit.clone(),
                settings,
            ),
            payments: PaymentService::new(shared.clone(), shared.clone(), audit.clone()),
            clients: ClientService::new(
                shared.clone(),
                shared.clone(),
                shared.clone(),
                audit.clone(),
            ),
            users: UserService::new(shared.clone(), audit.clone()),
            oauth: OAuthTokenService::new(shared, encryption),
            archiver,
            audit,
            store,
            storage,
        }
    }

    pub fn org_id(&self) -> Uuid {
        self.store.org_id()
    }
}
