//! `/api/session/{id}` — session snapshots and widget-driven events.
//!
//! The widget polls the snapshot to render its chrome (countdown banner,
//! submit control, staged-file chip) and posts the few actions the state
//! machine cannot infer from other endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use time::OffsetDateTime;

use super::ErrorBody;
use crate::session::SessionEvent;
use crate::sessions::SessionSnapshot;
use crate::state::AppState;

pub async fn snapshot_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, (StatusCode, Json<ErrorBody>)> {
    state
        .sessions
        .snapshot(&id, OffsetDateTime::now_utc())
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(ErrorBody::new("Unknown session"))))
}

/// Widget expanded for the first time.
pub async fn open_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, (StatusCode, Json<ErrorBody>)> {
    apply_and_snapshot(&state, &id, SessionEvent::Opened).await
}

/// The visitor chose to keep chatting; stop any countdown.
pub async fn continue_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, (StatusCode, Json<ErrorBody>)> {
    apply_and_snapshot(&state, &id, SessionEvent::CancelAutoSubmit).await
}

/// Discard the staged upload without sending it.
pub async fn clear_file_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, (StatusCode, Json<ErrorBody>)> {
    apply_and_snapshot(&state, &id, SessionEvent::FileCleared).await
}

async fn apply_and_snapshot(
    state: &AppState,
    id: &str,
    event: SessionEvent,
) -> Result<Json<SessionSnapshot>, (StatusCode, Json<ErrorBody>)> {
    let now = OffsetDateTime::now_utc();
    state.sessions.apply(id, event, now).await.map_err(|e| {
        (StatusCode::CONFLICT, Json(ErrorBody::with_details("Session event rejected", e.to_string())))
    })?;
    state
        .sessions
        .snapshot(id, now)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(ErrorBody::new("Unknown session"))))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
