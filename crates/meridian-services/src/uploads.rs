//! Upload-then-attach with compensating cleanup.
//!
//! Blobs are written first and their metadata appended to the owning record
//! afterwards. If the metadata step fails or the record has gone, the blob is
//! deleted again so storage never accumulates unreferenced files.

use std::future::Future;

use bytes::Bytes;
use chrono::Utc;
use meridian_core::models::FileAttachment;
use meridian_core::AppError;
use meridian_storage::Storage;
use uuid::Uuid;

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl FileUpload {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    fn check(&self, max_bytes: usize) -> Result<(), AppError> {
        if self.filename.trim().is_empty() {
            return Err(AppError::InvalidInput("filename is required".to_string()));
        }
        if self.data.is_empty() {
            return Err(AppError::InvalidInput("file is empty".to_string()));
        }
        if self.data.len() > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "{} bytes exceeds the {} byte limit",
                self.data.len(),
                max_bytes
            )));
        }
        Ok(())
    }
}

/// Where an upload belongs.
pub(crate) struct UploadTarget<'a> {
    pub org_id: Uuid,
    pub collection: &'a str,
    pub record_id: Uuid,
}

/// Upload `file`, then hand its metadata to `attach`.
///
/// `attach` returns `Ok(None)` when the owning record no longer exists; that
/// and any error remove the freshly written blob before returning.
pub(crate) async fn store_then_attach<T, F, Fut>(
    storage: &dyn Storage,
    target: UploadTarget<'_>,
    file: FileUpload,
    max_bytes: usize,
    attach: F,
) -> Result<T, AppError>
where
    F: FnOnce(FileAttachment) -> Fut,
    Fut: Future<Output = Result<Option<T>, AppError>>,
{
    file.check(max_bytes)?;

    let size_bytes = file.data.len() as i64;
    let storage_path = storage
        .upload(
            target.org_id,
            target.collection,
            target.record_id,
            &file.filename,
            &file.content_type,
            file.data,
        )
        .await?;

    let attachment = FileAttachment {
        name: file.filename,
        storage_path: storage_path.clone(),
        content_type: file.content_type,
        size_bytes,
        uploaded_at: Utc::now(),
    };

    let result = match attach(attachment).await {
        Ok(Some(record)) => return Ok(record),
        Ok(None) => Err(AppError::NotFound(format!(
            "{} record {} not found",
            target.collection, target.record_id
        ))),
        Err(e) => Err(e),
    };

    tracing::warn!(
        storage_path = %storage_path,
        record_id = %target.record_id,
        "Metadata update failed, removing uploaded blob"
    );
    if let Err(e) = storage.delete(&storage_path).await {
        tracing::error!(
            error = %e,
            storage_path = %storage_path,
            "Failed to remove orphaned blob"
        );
    }

    result
}

/// Remove blobs after their owning record is gone. Failures are logged only.
pub(crate) async fn remove_blobs(storage: &dyn Storage, files: &[FileAttachment]) {
    for file in files {
        if let Err(e) = storage.delete(&file.storage_path).await {
            tracing::warn!(
                error = %e,
                storage_path = %file.storage_path,
                "Failed to delete blob"
            );
        }
    }
}
