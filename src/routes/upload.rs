//! `POST /api/upload` — multipart image staging.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use super::ErrorBody;
use crate::services::upload::{UploadError, save_upload};
use crate::session::SessionEvent;
use crate::state::AppState;
use crate::store::FileRef;

#[derive(Debug, Serialize)]
pub struct UploadResponseBody {
    pub success: bool,
    pub file: FileRef,
}

fn upload_error_to_status(error: &UploadError) -> StatusCode {
    match error {
        UploadError::NoFile | UploadError::Multipart(_) => StatusCode::BAD_REQUEST,
        UploadError::NotAnImage => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponseBody>, (StatusCode, Json<ErrorBody>)> {
    let outcome = save_upload(&state.config.uploads_dir, state.config.max_upload_bytes, &mut multipart)
        .await
        .map_err(|e| {
            warn!(error = %e, "upload rejected");
            (
                upload_error_to_status(&e),
                Json(ErrorBody::with_details("Upload failed", e.to_string())),
            )
        })?;

    // Stage the file on the session so the next send picks it up.
    if let Some(conversation_id) = &outcome.conversation_id {
        let _ = state
            .sessions
            .apply(
                conversation_id,
                SessionEvent::FileStaged(outcome.file.clone()),
                OffsetDateTime::now_utc(),
            )
            .await;
    }

    Ok(Json(UploadResponseBody { success: true, file: outcome.file }))
}
