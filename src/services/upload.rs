//! Upload storage — image staging for the chat widget.
//!
//! One multipart field per request, images only, capped size. Stored under
//! the uploads directory with a timestamped name and served back via
//! `/uploads/...`.

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::store::FileRef;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    NoFile,
    #[error("Only image files are accepted")]
    NotAnImage,
    #[error("File exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("Upload could not be read: {0}")]
    Multipart(String),
    #[error("Upload could not be stored: {0}")]
    Io(#[from] std::io::Error),
}

/// Pick the stored filename: timestamp base plus the original extension.
#[must_use]
pub fn storage_filename(original_name: &str, now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("upload_{millis}{ext}")
}

/// A stored upload plus the conversation it belongs to, when the client
/// said so.
#[derive(Debug)]
pub struct UploadOutcome {
    pub file: FileRef,
    pub conversation_id: Option<String>,
}

/// Walk the multipart body: persist the file field, pick up an optional
/// `conversationId` text field for server-side staging.
///
/// # Errors
///
/// Rejects missing files, non-image MIME types, and oversize bodies;
/// surfaces IO failures from the uploads directory.
pub async fn save_upload(
    uploads_dir: &Path,
    max_bytes: u64,
    multipart: &mut Multipart,
) -> Result<UploadOutcome, UploadError> {
    let mut stored: Option<FileRef> = None;
    let mut conversation_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        if field.name() == Some("conversationId") {
            let id = field
                .text()
                .await
                .map_err(|e| UploadError::Multipart(e.to_string()))?;
            if !id.trim().is_empty() {
                conversation_id = Some(id);
            }
            continue;
        }
        if field.file_name().is_none() || stored.is_some() {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mimetype = field.content_type().unwrap_or_default().to_string();
        if !mimetype.contains("image") {
            return Err(UploadError::NotAnImage);
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?;
        if bytes.len() as u64 > max_bytes {
            return Err(UploadError::TooLarge { limit: max_bytes });
        }

        let now = OffsetDateTime::now_utc();
        let filename = storage_filename(&original_name, now);
        tokio::fs::create_dir_all(uploads_dir).await?;
        let destination: PathBuf = uploads_dir.join(&filename);
        tokio::fs::write(&destination, &bytes).await?;

        stored = Some(FileRef {
            url: format!("/uploads/{filename}"),
            filename,
            original_name,
            size: bytes.len() as u64,
            mimetype,
            uploaded_at: now.format(&Rfc3339).unwrap_or_default(),
        });
    }

    let file = stored.ok_or(UploadError::NoFile)?;
    info!(filename = %file.filename, size = file.size, "file uploaded");
    Ok(UploadOutcome { file, conversation_id })
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;
