use super::*;

use std::sync::Arc;

use crate::state::test_helpers::{MockLlm, test_state};
use crate::store::{ChatRole, FileRef, StoredMessage};

fn file_ref() -> FileRef {
    FileRef {
        filename: "upload_1700000000000.png".into(),
        original_name: "vase.png".into(),
        size: 2048,
        mimetype: "image/png".into(),
        url: "/uploads/upload_1700000000000.png".into(),
        uploaded_at: "2025-06-01T12:00:00Z".into(),
    }
}

// =============================================================================
// detect_language
// =============================================================================

#[test]
fn detects_swedish_from_stop_words() {
    assert_eq!(detect_language("jag vill ha bilder på en vas"), "sv");
}

#[test]
fn defaults_to_english() {
    assert_eq!(detect_language("I would like product photos of a vase"), "en");
}

#[test]
fn empty_message_is_english() {
    assert_eq!(detect_language(""), "en");
}

#[test]
fn ratio_must_exceed_ten_percent() {
    // One Swedish stop word out of eleven is under the threshold.
    assert_eq!(detect_language("please send the quote to me och thanks a lot friend"), "en");
}

// =============================================================================
// build_system_prompt
// =============================================================================

#[test]
fn prompt_reports_missing_contact_details() {
    let history = vec![StoredMessage::new(ChatRole::User, "hello there, nice day")];
    let prompt = build_system_prompt(&history);
    assert!(prompt.contains("Contact details collected: NO, NO"));
    assert!(prompt.contains("DO NOT ask for them again"));
}

#[test]
fn prompt_detects_stated_name() {
    let history = vec![StoredMessage::new(ChatRole::User, "my name is Anna")];
    let prompt = build_system_prompt(&history);
    assert!(prompt.contains("YES (name provided)"));
}

#[test]
fn prompt_detects_bare_name_reply() {
    let history = vec![StoredMessage::new(ChatRole::User, "Anna Lindqvist")];
    let prompt = build_system_prompt(&history);
    assert!(prompt.contains("YES (name provided)"));
}

#[test]
fn prompt_detects_email() {
    let history = vec![StoredMessage::new(ChatRole::User, "reach me at anna@studio.se")];
    let prompt = build_system_prompt(&history);
    assert!(prompt.contains("YES (email provided)"));
}

#[test]
fn prompt_quotes_project_discussion() {
    let history = vec![StoredMessage::new(ChatRole::User, "I need an ecom photography package")];
    let prompt = build_system_prompt(&history);
    assert!(prompt.contains("YES - I need an ecom photography package"));
}

#[test]
fn prompt_counts_messages() {
    let history = vec![
        StoredMessage::new(ChatRole::User, "hi"),
        StoredMessage::new(ChatRole::Assistant, "hello"),
    ];
    let prompt = build_system_prompt(&history);
    assert!(prompt.contains("Conversation length: 2 messages"));
}

// =============================================================================
// run_turn
// =============================================================================

#[tokio::test]
async fn turn_persists_user_and_assistant_messages() {
    let llm = MockLlm::scripted(&["Welcome! What are we shooting?"]);
    let state = test_state(Some(llm.clone() as Arc<dyn crate::llm::LlmChat>), None);

    let outcome = run_turn(&state, "c1", "I need product photos", None).await;
    assert_eq!(outcome.response, "Welcome! What are we shooting?");
    assert_eq!(outcome.conversation_length, 2);
    assert!(!outcome.ready);

    let history = state.store.history("c1").await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, ChatRole::User);
    assert_eq!(history[1].role, ChatRole::Assistant);
}

#[tokio::test]
async fn turn_sends_context_aware_system_prompt() {
    let llm = MockLlm::scripted(&["Noted."]);
    let state = test_state(Some(llm.clone() as Arc<dyn crate::llm::LlmChat>), None);

    run_turn(&state, "c1", "anna@studio.se", None).await;

    let calls = llm.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].system.contains("maître d'"));
    assert!(calls[0].system.contains("YES (email provided)"));
    assert_eq!(calls[0].max_tokens, state.config.llm_max_tokens);
    assert_eq!(calls[0].messages.len(), 1);
}

#[tokio::test]
async fn marker_reply_is_stripped_and_flags_ready() {
    let llm = MockLlm::scripted(&["Your brief looks complete. READY_TO_SUBMIT"]);
    let state = test_state(Some(llm as Arc<dyn crate::llm::LlmChat>), None);

    let outcome = run_turn(&state, "c1", "that's everything", None).await;
    assert!(outcome.ready);
    assert_eq!(outcome.response, "Your brief looks complete.");

    // The stored reply is also clean.
    let history = state.store.history("c1").await;
    assert!(!history[1].content.contains("READY_TO_SUBMIT"));
}

#[tokio::test]
async fn gateway_error_degrades_to_apology() {
    let llm = MockLlm::scripted(&[]);
    let state = test_state(Some(llm as Arc<dyn crate::llm::LlmChat>), None);

    let outcome = run_turn(&state, "c1", "hello", None).await;
    assert_eq!(outcome.response, APOLOGY_REPLY);
    assert!(!outcome.ready);

    // The apology still lands in history like any reply.
    let history = state.store.history("c1").await;
    assert_eq!(history[1].content, APOLOGY_REPLY);
}

#[tokio::test]
async fn missing_gateway_degrades_to_apology() {
    let state = test_state(None, None);
    let outcome = run_turn(&state, "c1", "hello", None).await;
    assert_eq!(outcome.response, APOLOGY_REPLY);
}

#[tokio::test]
async fn attached_file_becomes_upload_message() {
    let llm = MockLlm::scripted(&["A lovely vase!"]);
    let state = test_state(Some(llm as Arc<dyn crate::llm::LlmChat>), None);

    let outcome = run_turn(&state, "c1", "here it is", Some(file_ref())).await;
    assert_eq!(outcome.conversation_length, 3);

    let history = state.store.history("c1").await;
    assert_eq!(history[0].content, format!("{UPLOAD_PREFIX}vase.png"));
    assert!(history[0].file.is_some());
    assert_eq!(history[1].content, "here it is");
}

#[tokio::test]
async fn heuristic_readiness_flags_turn_without_marker() {
    let llm = MockLlm::scripted(&["Wonderful, I have everything for your brief now."]);
    let state = test_state(Some(llm as Arc<dyn crate::llm::LlmChat>), None);

    // Six prior messages; the turn brings the count to eight.
    let now = time::OffsetDateTime::now_utc();
    state
        .store
        .append(
            "c1",
            vec![
                StoredMessage::new(ChatRole::User, "Hi, I need product photos"),
                StoredMessage::new(ChatRole::Assistant, "Of course. What are you shooting?"),
                StoredMessage::new(ChatRole::User, "Ceramic vases"),
                StoredMessage::new(ChatRole::Assistant, "Lovely. Any deadline?"),
                StoredMessage::new(ChatRole::User, "End of the month"),
                StoredMessage::new(ChatRole::Assistant, "Noted. Where can we reach you?"),
            ],
            now,
        )
        .await;

    let outcome = run_turn(&state, "c1", "anna@studio.se", None).await;
    assert_eq!(outcome.conversation_length, 8);
    assert!(outcome.ready);
}

#[tokio::test]
async fn detected_language_rides_on_the_user_message() {
    let llm = MockLlm::scripted(&["Självklart!"]);
    let state = test_state(Some(llm as Arc<dyn crate::llm::LlmChat>), None);
    let outcome = run_turn(&state, "c1", "jag vill ha en offert på bilder", None).await;
    assert_eq!(outcome.language, "sv");
}
