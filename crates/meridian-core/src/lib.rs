//! Meridian Core Library
//!
//! Domain models, the payment recurrence projector, schedule time helpers, the
//! role policy, session context, error types and configuration shared by every
//! Meridian crate.

pub mod config;
pub mod constants;
pub mod encryption;
pub mod error;
pub mod models;
pub mod policy;
pub mod recurrence;
pub mod schedule_time;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use encryption::EncryptionService;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use policy::{Operation, Resource, Role};
pub use recurrence::{project_due_dates, MonthWindow, ProjectedDueDates};
pub use session::{ActorContext, SessionClaims};
