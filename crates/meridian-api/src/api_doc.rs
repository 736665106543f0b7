//! OpenAPI documentation, served at `/api/v1/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use meridian_core::models;

/// Registers the HS256 bearer scheme referenced by protected routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Meridian API",
        version = "0.1.0",
        description = "Client meetings, meeting history and payment schedules for advisory practices. All endpoints are versioned under /api/v1/."
    ),
    modifiers(&SecurityAddon),
    paths(
        handlers::health::health,
        handlers::session::get_session,
        // Meetings
        handlers::meetings::list_meetings,
        handlers::meetings::create_meeting,
        handlers::meetings::upcoming_reminders,
        handlers::meetings::get_meeting,
        handlers::meetings::reschedule_meeting,
        handlers::meetings::delete_meeting,
        handlers::meetings::upload_attachment,
        handlers::meetings::attachment_url,
        // History
        handlers::history::list_history,
        handlers::history::get_history,
        handlers::history::upload_mom_file,
        handlers::history::history_file_url,
        handlers::archive::run_archiver,
        // Payments
        handlers::payments::list_payments,
        handlers::payments::create_payment,
        handlers::payments::due_in_month,
        handlers::payments::get_payment,
        handlers::payments::set_payment_status,
        handlers::payments::delete_payment,
        // Clients
        handlers::clients::list_clients,
        handlers::clients::create_client,
        handlers::clients::get_client,
        handlers::clients::rename_client,
        handlers::clients::delete_client,
        handlers::clients::list_notes,
        handlers::clients::add_note,
        // Users and audit
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::set_role,
        handlers::users::deactivate_user,
        handlers::activity::list_activity,
        // Integrations and files
        handlers::integrations::store_token,
        handlers::integrations::token_status,
        handlers::files::get_signed_file,
    ),
    components(
        schemas(
            models::ScheduledMeeting,
            models::CreateMeetingRequest,
            models::RescheduleMeetingRequest,
            models::UpcomingReminder,
            models::FileAttachment,
            models::MeetingType,
            models::AlertType,
            models::HistoryRecord,
            models::PaymentSchedule,
            models::CreatePaymentScheduleRequest,
            models::SetPaymentStatusRequest,
            models::DueOccurrence,
            models::Frequency,
            models::PaymentStatus,
            models::Client,
            models::ClientType,
            models::CreateClientRequest,
            models::RenameClientRequest,
            models::ClientNote,
            models::CreateClientNoteRequest,
            models::User,
            models::CreateUserRequest,
            models::SetRoleRequest,
            models::ActivityLogEntry,
            models::ActivityAction,
            meridian_core::Role,
            handlers::session::SessionResponse,
            meridian_services::ArchiveReport,
            handlers::uploads::SignedUrlResponse,
            handlers::integrations::StoreTokenRequest,
            handlers::integrations::TokenStatusResponse,
            handlers::health::HealthResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "session", description = "Session bootstrap"),
        (name = "meetings", description = "Scheduled meetings, attachments and reminders"),
        (name = "history", description = "Archived meetings and minutes of meeting"),
        (name = "payments", description = "Payment schedules and the monthly due calendar"),
        (name = "clients", description = "Clients and client notes"),
        (name = "users", description = "Organisation members and roles"),
        (name = "activity", description = "Audit trail"),
        (name = "integrations", description = "Third-party provider tokens"),
        (name = "files", description = "Signed file downloads"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_versioned_paths() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/v1/meetings"));
        assert!(spec.paths.paths.contains_key("/api/v1/payments/due"));
        assert!(spec.paths.paths.contains_key("/api/v1/files/{token}"));
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let spec = get_openapi_spec();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_archive_report_schema_is_shared() {
        let spec = get_openapi_spec();
        let components = spec.components.expect("components");
        assert!(components.schemas.contains_key("ArchiveReport"));
        assert!(!components.schemas.contains_key("ArchiveReportResponse"));
    }
}
