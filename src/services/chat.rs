//! Chat turns — persona prompt, context awareness, and the single LLM call
//! per user message.
//!
//! DESIGN
//! ======
//! The system prompt is the fixed persona plus a machine-generated context
//! block derived from history (name/email/project facts), so the model
//! stops re-asking for details it already has. A turn never fails: any
//! gateway problem resolves to a fixed apologetic reply appended to the
//! conversation like any other assistant message.

use tracing::{error, info};

use super::brief::UPLOAD_PREFIX;
use crate::llm::types::Message;
use crate::state::AppState;
use crate::store::{ChatRole, FileRef, StoredMessage};

/// Marker the model appends when it judges the brief complete. Stripped
/// before the reply is stored or shown.
pub const READY_MARKER: &str = "READY_TO_SUBMIT";

/// Reply used whenever the gateway is missing or errors.
pub const APOLOGY_REPLY: &str = "Sorry, I encountered an error. Please try again.";

const PERSONA_PROMPT: &str = r#"You are the maître d' for Intelligence Matters, a creative AI agency (intelligencematters.se). You embody the sophistication of a French maître d' - knowledgeable, attentive, and subtly guiding clients toward the perfect experience.

CRITICAL FILE UPLOAD UNDERSTANDING:
- There is only ONE upload button (📎) in the interface
- When users upload files, the system automatically categorizes them based on conversation context
- DO NOT ask users to use specific buttons like "📦 button" or "🎨 button" - there's only one upload button
- Simply say "Could you share a photo of [item]?" or "Feel free to upload an image"
- The system will handle the categorization automatically

CONVERSATION FLOW:
1. Warm greeting, get their name
2. Collect email for follow-up
3. Understand their project through natural conversation
4. Guide toward file uploads when relevant (using natural language, not button references)
5. Build comprehensive brief through progressive disclosure

PROGRESSIVE DISCLOSURE PRINCIPLES:
- Start broad, get specific gradually
- Ask follow-up questions based on their responses
- Don't overwhelm with forms - make it conversational
- Naturally guide toward submission when brief feels complete

FILE HANDLING:
- When they upload files, acknowledge them professionally
- Ask clarifying questions about the images to build context
- Don't get confused about which image is what - focus on understanding their needs

PERSONALITY:
- Sophisticated but approachable
- Genuinely curious about their creative vision
- Subtly confident in your expertise
- Never pushy, always helpful

Remember: You're not just collecting information - you're curating an experience that reflects Intelligence Matters' premium positioning.

When the brief feels complete and contact details are collected, end your reply with the single word READY_TO_SUBMIT on its own."#;

const SWEDISH_WORDS: &[&str] = &[
    "och", "att", "det", "är", "jag", "på", "en", "av", "för", "till", "med", "har", "som",
    "inte", "kan", "vi", "om", "var", "så", "blir",
];

const PROJECT_HINTS: &[&str] = &["ecom", "photography", "shoot", "concept", "brand"];

// =============================================================================
// LANGUAGE / CONTEXT HEURISTICS
// =============================================================================

/// Swedish stop-word ratio heuristic: above 10% the message counts as
/// Swedish.
#[must_use]
pub fn detect_language(text: &str) -> &'static str {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return "en";
    }
    let swedish = words
        .iter()
        .filter(|w| SWEDISH_WORDS.contains(&w.to_lowercase().as_str()))
        .count();
    if swedish * 10 > words.len() { "sv" } else { "en" }
}

/// A short capitalized-words-only message reads like a bare name reply.
fn looks_like_bare_name(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.split(' ').all(|word| {
        let mut chars = word.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
            && chars.all(|c| c.is_ascii_lowercase())
    })
}

/// Persona prompt plus the context block for this conversation.
#[must_use]
pub fn build_system_prompt(history: &[StoredMessage]) -> String {
    let has_name = history.iter().any(|m| {
        m.role == ChatRole::User
            && (m.content.to_lowercase().contains("my name is")
                || m.content.to_lowercase().contains("i'm ")
                || looks_like_bare_name(&m.content))
    });
    let has_email = history
        .iter()
        .any(|m| m.role == ChatRole::User && m.content.contains('@'));
    let project = history.iter().find(|m| {
        let content = m.content.to_lowercase();
        PROJECT_HINTS.iter().any(|hint| content.contains(hint))
    });

    let name_line = if has_name { "YES (name provided)" } else { "NO" };
    let email_line = if has_email { "YES (email provided)" } else { "NO" };
    let project_line = project.map_or_else(
        || "NO".to_string(),
        |m| format!("YES - {}", m.content.chars().take(100).collect::<String>()),
    );

    format!(
        "{PERSONA_PROMPT}\n\n\
         IMPORTANT CONVERSATION CONTEXT:\n\
         - Contact details collected: {name_line}, {email_line}\n\
         - Project discussion: {project_line}\n\
         - Conversation length: {} messages\n\n\
         CRITICAL: If contact details are already provided, DO NOT ask for them again. \
         Reference the person by name if you have it.",
        history.len()
    )
}

// =============================================================================
// TURN
// =============================================================================

/// What a completed turn reports back to the handler.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Assistant reply with the readiness marker stripped.
    pub response: String,
    pub conversation_length: usize,
    pub language: &'static str,
    /// Model marker fired or the heuristic judged the brief complete.
    pub ready: bool,
}

/// Run one turn: persist the user message (and any attached upload), call
/// the gateway, persist the reply. Never fails; degraded turns get the
/// apology reply.
pub async fn run_turn(
    state: &AppState,
    conversation_id: &str,
    message: &str,
    attached: Option<FileRef>,
) -> ChatOutcome {
    let now = time::OffsetDateTime::now_utc();
    let mut new_messages = Vec::new();
    if let Some(file) = attached {
        new_messages.push(StoredMessage::with_file(
            ChatRole::User,
            format!("{UPLOAD_PREFIX}{}", file.original_name),
            file,
        ));
    }
    if !message.trim().is_empty() {
        new_messages.push(StoredMessage::new(ChatRole::User, message));
    }
    state.store.append(conversation_id, new_messages, now).await;

    let history = state.store.history(conversation_id).await;
    let system = build_system_prompt(&history);
    let llm_messages: Vec<Message> = history
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .map(|m| {
            let role = if m.role == ChatRole::User { "user" } else { "assistant" };
            Message::text(role, m.content.clone())
        })
        .collect();

    let raw_reply = match &state.llm {
        Some(llm) => match llm.chat(state.config.llm_max_tokens, &system, &llm_messages).await {
            Ok(response) => response.text(),
            Err(e) => {
                error!(%conversation_id, error = %e, "chat turn failed");
                APOLOGY_REPLY.to_string()
            }
        },
        None => {
            error!(%conversation_id, "chat turn without an LLM client");
            APOLOGY_REPLY.to_string()
        }
    };

    let marker_fired = raw_reply.contains(READY_MARKER);
    let response = raw_reply.replace(READY_MARKER, "").trim().to_string();

    let conversation_length = state
        .store
        .append(
            conversation_id,
            vec![StoredMessage::new(ChatRole::Assistant, response.clone())],
            time::OffsetDateTime::now_utc(),
        )
        .await;

    let history = state.store.history(conversation_id).await;
    let signal = state.readiness.assess(&history);
    let ready = marker_fired || signal.ready;

    info!(
        %conversation_id,
        conversation_length,
        marker_fired,
        heuristic_ready = signal.ready,
        "chat turn completed"
    );

    ChatOutcome {
        response,
        conversation_length,
        language: detect_language(message),
        ready,
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
