//! `POST /api/chat` — one conversational turn.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::ErrorBody;
use crate::services::chat::run_turn;
use crate::session::{Effect, SessionEvent};
use crate::state::AppState;
use crate::store::{FileRef, generate_conversation_id};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// File reference sent along by clients that stage uploads themselves.
    #[serde(default)]
    pub file_info: Option<FileRef>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseBody {
    pub response: String,
    pub conversation_id: String,
    pub metadata: ChatMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadata {
    pub conversation_length: usize,
    pub language: &'static str,
}

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponseBody>, (StatusCode, Json<ErrorBody>)> {
    let now = OffsetDateTime::now_utc();
    let conversation_id = body
        .conversation_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| generate_conversation_id(now));

    // One outstanding turn per conversation.
    state
        .sessions
        .apply(&conversation_id, SessionEvent::SendStarted, now)
        .await
        .map_err(|e| {
            (
                StatusCode::CONFLICT,
                Json(ErrorBody::with_details("Please wait for the current reply", e.to_string())),
            )
        })?;
    // If the client disconnects before the turn resolves, the guard frees
    // the conversation instead of leaving it awaiting forever.
    let guard = state.sessions.guard_in_flight(&conversation_id);

    // An explicit fileInfo wins; the staged slot stays put for a later send.
    let attached = match body.file_info {
        Some(file) => Some(file),
        None => state.sessions.take_staged_file(&conversation_id).await,
    };

    let outcome = run_turn(&state, &conversation_id, &body.message, attached).await;

    let effects = state
        .sessions
        .apply(
            &conversation_id,
            SessionEvent::ReplyReceived { ready: outcome.ready },
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap_or_default();
    guard.disarm();
    if effects.contains(&Effect::StartReveal) {
        state.sessions.begin_reveal(&conversation_id, &outcome.response).await;
    }

    Ok(Json(ChatResponseBody {
        response: outcome.response,
        conversation_id,
        metadata: ChatMetadata {
            conversation_length: outcome.conversation_length,
            language: outcome.language,
        },
    }))
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
