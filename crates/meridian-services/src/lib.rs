//! Meridian Services Layer
//!
//! Business services sit between the HTTP layer and the stores. Each operation
//! takes the acting user, checks the role policy, scopes every store call to the
//! actor's organisation and records an audit entry for mutations.

pub mod archiver;
pub mod audit;
pub mod clients;
pub mod history;
pub mod meetings;
pub mod oauth;
pub mod payments;
pub mod settings;
pub mod uploads;
pub mod users;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use archiver::{ArchiveReport, ArchiverService};
pub use audit::AuditTrail;
pub use clients::ClientService;
pub use history::HistoryService;
pub use meetings::MeetingService;
pub use oauth::OAuthTokenService;
pub use payments::PaymentService;
pub use settings::ServiceSettings;
pub use uploads::FileUpload;
pub use users::UserService;

use chrono::Utc;
use meridian_core::{ActorContext, AppError, Operation, Resource};

/// Session liveness plus role check, run before any store access.
pub(crate) fn permit(
    actor: &ActorContext,
    resource: Resource,
    operation: Operation,
) -> Result<(), AppError> {
    actor.ensure_active(Utc::now())?;
    actor.authorize(resource, operation)
}
