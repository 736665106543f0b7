//! The blob storage seam.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use meridian_core::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::keys::generate_storage_key;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not store blob: {0}")]
    UploadFailed(String),

    #[error("could not read blob: {0}")]
    DownloadFailed(String),

    #[error("could not remove blob: {0}")]
    DeleteFailed(String),

    #[error("no blob at {0}")]
    NotFound(String),

    #[error("bad storage key: {0}")]
    InvalidKey(String),

    #[error("file link is invalid or has expired")]
    InvalidSignature,

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("storage misconfigured: {0}")]
    ConfigError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("file {} does not exist", key)),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::InvalidSignature => AppError::Unauthorized(err.to_string()),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// A place to keep attachment and minutes files.
///
/// Services only ever see `Arc<dyn Storage>`; the local filesystem backend and
/// the in-memory test double both implement it.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Writes `data` under exactly `storage_key`, replacing any previous blob.
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Removing a blob that is already gone is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// A link that serves the blob without a session until `expires_in` passes.
    async fn signed_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String>;

    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    fn backend_name(&self) -> &'static str;

    /// Stores a file belonging to `record_id` under a fresh key and returns the key.
    async fn upload(
        &self,
        org_id: Uuid,
        collection: &str,
        record_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<String> {
        let key = generate_storage_key(org_id, collection, record_id, filename);
        self.put(&key, data, content_type).await?;
        Ok(key)
    }
}
