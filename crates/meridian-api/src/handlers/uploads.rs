//! Multipart helpers shared by the attachment and MOM file routes.

use axum::extract::Multipart;
use meridian_core::AppError;
use meridian_services::FileUpload;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query selecting one stored file of a record.
#[derive(Debug, Deserialize, IntoParams)]
pub struct FilePathQuery {
    /// Storage path as returned in the record's file list
    pub path: String,
}

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct SignedUrlResponse {
    pub url: String,
}

/// Read the single field named `file` from a multipart form.
pub async fn extract_multipart_file(mut multipart: Multipart) -> Result<FileUpload, AppError> {
    let mut upload: Option<FileUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if upload.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let filename = field.file_name().unwrap_or("unknown").to_string();
        let content_type = normalize_mime_type(field.content_type().unwrap_or("application/octet-stream"));
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

        upload = Some(FileUpload::new(filename, content_type, data));
    }

    upload.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))
}

/// Strip MIME parameters ("text/plain; charset=utf-8" -> "text/plain").
fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or(content_type)
        .to_lowercase()
}

/// Content type to serve a stored file with, guessed from its key.
pub fn content_type_for_key(storage_key: &str) -> &'static str {
    let extension = storage_key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => "application/octet-stream",
    }
}
