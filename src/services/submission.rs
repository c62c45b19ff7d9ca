//! Submission — the full extract-and-relay pipeline, shared by the manual
//! endpoint, the unload beacon, and the auto-submit sweep.

use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use super::brief::{extract_brief, uploaded_files};
use super::relay::{RelayError, SubmissionPayload, build_payload};
use crate::state::AppState;
use crate::store::{ChatRole, StoredMessage};

/// History note recorded before an inactivity submission.
pub const AUTO_SUBMIT_NOTE: &str =
    "AUTO_SUBMIT: Brief automatically submitted due to user inactivity after 4 minutes (2 min silent + 2 min countdown)";

/// History note recorded before an unload-beacon submission.
pub const BROWSER_CLOSE_NOTE: &str =
    "BROWSER_CLOSE: Brief automatically submitted due to user leaving page";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("nothing to submit: conversation is empty")]
    EmptyConversation,
    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Extract the lead record from `history` and deliver it.
///
/// Extraction itself never fails (it degrades to the sentinel record);
/// only relay problems surface as errors.
///
/// # Errors
///
/// `EmptyConversation` when there is nothing to extract from; `Relay` when
/// the webhook is unconfigured, unreachable, or rejects the payload.
pub async fn run_submission(
    state: &AppState,
    conversation_id: &str,
    history: &[StoredMessage],
    auto_submit: bool,
) -> Result<SubmissionPayload, SubmitError> {
    if history.is_empty() {
        return Err(SubmitError::EmptyConversation);
    }

    let files = uploaded_files(history);
    let lead = extract_brief(
        state.llm.as_ref(),
        state.config.extract_max_tokens,
        history,
        &files,
    )
    .await;
    let payload = build_payload(
        lead,
        conversation_id,
        &files,
        history.len(),
        auto_submit,
        OffsetDateTime::now_utc(),
    );

    let relay = state.relay.as_ref().ok_or(RelayError::NotConfigured)?;
    relay.deliver(&payload).await?;

    info!(
        %conversation_id,
        auto_submit,
        files = payload.total_files,
        "brief submitted"
    );
    Ok(payload)
}

/// Assistant message confirming a successful submission.
#[must_use]
pub fn confirmation_message(conversation_id: &str, auto_submit: bool, has_files: bool) -> String {
    if auto_submit {
        return "I've automatically submitted your brief since we had such a great conversation! \
                Our team will review it and get back to you soon. Feel free to continue chatting \
                if you'd like to add more details or have other questions."
            .to_string();
    }
    let file_note = if has_files {
        String::new()
    } else {
        format!(
            " If you need to send visual references later, email them to the project contact \
             with the subject \"Project REF: {conversation_id}\"."
        )
    };
    format!(
        "Perfect! Your brief has been submitted successfully. Our team will review it and get \
         back to you soon.{file_note} Would you like to refine any details, submit another \
         brief, or is there anything else I can help you with?"
    )
}

/// Append the post-submission confirmation to the conversation.
pub async fn append_confirmation(state: &AppState, conversation_id: &str, auto_submit: bool, has_files: bool) {
    let text = confirmation_message(conversation_id, auto_submit, has_files);
    state
        .store
        .append(
            conversation_id,
            vec![StoredMessage::new(ChatRole::Assistant, text)],
            OffsetDateTime::now_utc(),
        )
        .await;
}

#[cfg(test)]
#[path = "submission_test.rs"]
mod tests;
