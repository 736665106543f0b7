//! Meridian Database Layer
//!
//! PostgreSQL repositories (one per collection) and the store traits the
//! services are written against. Every query is scoped by `org_id`.

pub mod db;
pub mod pool;
pub mod store_traits;

pub use db::{
    ActivityLogRepository, ClientRepository, HistoryRepository, MeetingRepository,
    OAuthTokenRepository, OrganizationRepository, PaymentRepository, UserRepository,
};
pub use pool::{setup_database, MIGRATOR};
pub use store_traits::{
    ActivityLogStore, ClientStore, HistoryStore, MeetingStore, OAuthTokenStore,
    OrganizationStore, PaymentStore, UserStore,
};
