//! Application state shared by every handler.

use std::sync::Arc;

use meridian_services::{
    ArchiverService, AuditTrail, ClientService, HistoryService, MeetingService,
    OAuthTokenService, PaymentService, UserService,
};
use meridian_storage::{Storage, UrlSigner};

use crate::auth::JwtVerifier;

/// Blob access for the signed download route.
#[derive(Clone)]
pub struct FileState {
    pub storage: Arc<dyn Storage>,
    pub signer: UrlSigner,
}

pub struct AppState {
    pub auth: JwtVerifier,
    pub users: UserService,
    pub meetings: MeetingService,
    pub history: HistoryService,
    pub payments: PaymentService,
    pub clients: ClientService,
    pub oauth: OAuthTokenService,
    pub audit: AuditTrail,
    pub archiver: Arc<ArchiverService>,
    pub files: FileState,
    /// Upper bound for a multipart upload request body.
    pub max_upload_bytes: usize,
}
