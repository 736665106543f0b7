//! Database repositories for data access layer
//!
//! One repository per collection. Each implements its store trait from
//! `crate::store_traits`.

pub mod activity;
pub mod client;
pub mod history;
pub mod meeting;
pub mod oauth;
pub mod organization;
pub mod payment;
pub mod user;

pub use activity::ActivityLogRepository;
pub use client::ClientRepository;
pub use history::HistoryRepository;
pub use meeting::MeetingRepository;
pub use oauth::OAuthTokenRepository;
pub use organization::OrganizationRepository;
pub use payment::PaymentRepository;
pub use user::UserRepository;
