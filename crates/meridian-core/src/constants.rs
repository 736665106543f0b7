//! Shared constants

/// API path prefix for versioned routes
pub const API_PREFIX: &str = "/api/v1";

/// How far past the requested year quarterly/half-yearly projection keeps stepping.
pub const RECURRENCE_HORIZON_YEARS: i32 = 10;

/// Default interval between archiver runs, in seconds.
pub const DEFAULT_ARCHIVE_INTERVAL_SECS: u64 = 300;

/// Actor name recorded in the activity log for scheduled jobs.
pub const SYSTEM_ACTOR_NAME: &str = "system";

/// Collection names used in activity log entries and storage keys.
pub mod collections {
    pub const MEETINGS: &str = "meetings";
    pub const MEETING_HISTORY: &str = "meeting_history";
    pub const PAYMENT_SCHEDULES: &str = "payment_schedules";
    pub const CLIENTS: &str = "clients";
    pub const CLIENT_NOTES: &str = "client_notes";
    pub const USERS: &str = "users";
    pub const OAUTH_TOKENS: &str = "oauth_tokens";
}
