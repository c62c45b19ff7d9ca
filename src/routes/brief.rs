//! `POST /api/submit-brief` — manual, timer-driven, and unload-beacon
//! submissions.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{error, info};

use super::ErrorBody;
use crate::services::relay::SubmissionPayload;
use crate::services::submission::{BROWSER_CLOSE_NOTE, append_confirmation, run_submission};
use crate::session::SessionEvent;
use crate::state::AppState;
use crate::store::{ChatRole, StoredMessage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBriefRequest {
    /// Client-held transcript; used only when the server has none.
    #[serde(default)]
    pub conversation_history: Vec<StoredMessage>,
    pub conversation_id: String,
    #[serde(default)]
    pub auto_submit: bool,
    #[serde(default)]
    pub browser_close: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBriefResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_data: Option<SubmissionPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_analysis: Option<QuickAnalysis>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickAnalysis {
    pub request_type: String,
    pub readiness_level: String,
    pub next_steps: String,
}

pub async fn submit_brief_handler(
    State(state): State<AppState>,
    Json(body): Json<SubmitBriefRequest>,
) -> Result<Json<SubmitBriefResponse>, (StatusCode, Json<ErrorBody>)> {
    let conversation_id = body.conversation_id.clone();

    // The server transcript wins; the client copy only covers sessions the
    // server never saw (restart, beacon from a stale tab).
    let mut history = state.store.history(&conversation_id).await;
    if history.is_empty() && !body.conversation_history.is_empty() {
        state
            .store
            .append(&conversation_id, body.conversation_history, OffsetDateTime::now_utc())
            .await;
        history = state.store.history(&conversation_id).await;
    }

    if body.browser_close {
        return Ok(browser_close_submit(state, conversation_id));
    }

    // Manual submissions hold the Submitting phase; guard it so a dropped
    // request cannot wedge the session there.
    let guard = if body.auto_submit {
        None
    } else {
        state
            .sessions
            .apply(&conversation_id, SessionEvent::ManualSubmitStarted, OffsetDateTime::now_utc())
            .await
            .map_err(|e| {
                (
                    StatusCode::CONFLICT,
                    Json(ErrorBody::with_details("Cannot submit right now", e.to_string())),
                )
            })?;
        Some(state.sessions.guard_in_flight(&conversation_id))
    };

    let result = run_submission(&state, &conversation_id, &history, body.auto_submit).await;
    let success = result.is_ok();
    let _ = state
        .sessions
        .apply(
            &conversation_id,
            SessionEvent::SubmitFinished { auto: body.auto_submit, success },
            OffsetDateTime::now_utc(),
        )
        .await;
    if let Some(guard) = guard {
        guard.disarm();
    }

    match result {
        Ok(payload) => {
            let has_files = payload.total_files > 0;
            append_confirmation(&state, &conversation_id, body.auto_submit, has_files).await;
            let quick = QuickAnalysis {
                request_type: payload.lead.request_type.clone(),
                readiness_level: payload.lead.readiness_level.clone(),
                next_steps: payload.lead.next_steps.clone(),
            };
            Ok(Json(SubmitBriefResponse {
                success: true,
                lead_data: Some(payload),
                quick_analysis: Some(quick),
            }))
        }
        Err(e) => {
            error!(%conversation_id, error = %e, "brief submission failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::with_details("Failed to submit brief", e.to_string())),
            ))
        }
    }
}

/// Unload beacons get an instant acknowledgement; extraction and relay run
/// detached, best effort, no retry.
fn browser_close_submit(state: AppState, conversation_id: String) -> Json<SubmitBriefResponse> {
    info!(%conversation_id, "browser-close submission queued");
    tokio::spawn(async move {
        state
            .store
            .append(
                &conversation_id,
                vec![StoredMessage::new(ChatRole::System, BROWSER_CLOSE_NOTE)],
                OffsetDateTime::now_utc(),
            )
            .await;
        let history = state.store.history(&conversation_id).await;
        match run_submission(&state, &conversation_id, &history, true).await {
            Ok(payload) => {
                let _ = state
                    .sessions
                    .apply(
                        &conversation_id,
                        SessionEvent::SubmitFinished { auto: true, success: true },
                        OffsetDateTime::now_utc(),
                    )
                    .await;
                info!(%conversation_id, files = payload.total_files, "browser-close submission delivered");
            }
            Err(e) => error!(%conversation_id, error = %e, "browser-close submission failed"),
        }
    });
    Json(SubmitBriefResponse { success: true, lead_data: None, quick_analysis: None })
}

#[cfg(test)]
#[path = "brief_test.rs"]
mod tests;
