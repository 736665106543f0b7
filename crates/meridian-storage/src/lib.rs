//! Meridian Storage Library
//!
//! Blob storage for meeting attachments and minutes-of-meeting files: the
//! `Storage` trait, the local filesystem backend and HMAC-signed view URLs.
//!
//! # Storage key format
//!
//! Keys are organisation-scoped:
//! `orgs/{org_id}/{collection}/{record_id}/{uuid}-{filename}`.
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod keys;
pub mod local;
pub mod signed_url;
pub mod traits;

// Re-export commonly used types
pub use keys::{generate_storage_key, key_belongs_to_org};
pub use local::LocalStorage;
pub use signed_url::UrlSigner;
pub use traits::{Storage, StorageError, StorageResult};
