//! Brief extraction — turns a finished conversation into a structured lead
//! record.
//!
//! DESIGN
//! ======
//! One LLM request with a rigid JSON template, including per-file
//! product/reference categorization. Parsing is defensive: the first
//! balanced JSON object in the reply is deserialized, and any failure at
//! all yields a fully-populated sentinel record so the downstream
//! automation always receives the same shape.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::llm::LlmChat;
use crate::llm::types::Message;
use crate::store::{ChatRole, FileRef, StoredMessage};

/// Marker the upload flow puts in front of a file message.
pub const UPLOAD_PREFIX: &str = "📎 Uploaded: ";

// =============================================================================
// RECORD
// =============================================================================

fn not_provided() -> String {
    "Not provided".to_string()
}

fn unclear() -> String {
    "unclear".to_string()
}

fn low() -> String {
    "low".to_string()
}

/// The rigid lead schema. Field names and sentinel values are the contract
/// with the downstream automation; never add, remove, or rename fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefRecord {
    #[serde(default = "not_provided")]
    pub contact_name: String,
    #[serde(default = "not_provided")]
    pub contact_email: String,
    #[serde(default = "not_provided")]
    pub contact_company: String,
    #[serde(default = "not_provided")]
    pub contact_title: String,
    #[serde(default = "unclear")]
    pub request_type: String,
    #[serde(default = "unclear")]
    pub service_category: String,
    #[serde(default)]
    pub project_brief: String,
    #[serde(default = "not_provided")]
    pub timeline: String,
    #[serde(default = "not_provided")]
    pub budget: String,
    #[serde(default = "not_provided")]
    pub inspiration: String,
    #[serde(default = "not_provided")]
    pub technical_specs: String,
    #[serde(default = "not_provided")]
    pub model_preferences: String,
    #[serde(default = "not_provided")]
    pub brand_guidelines: String,
    #[serde(default = "not_provided")]
    pub deliverables: String,
    #[serde(default = "unclear")]
    pub readiness_level: String,
    #[serde(default = "low")]
    pub engagement_level: String,
    #[serde(default = "unclear")]
    pub primary_language: String,
    #[serde(default)]
    pub key_topics: String,
    #[serde(default)]
    pub next_steps: String,
    #[serde(default)]
    pub missing_info: String,
    #[serde(default)]
    pub conversation_summary: String,
    /// Consumed during payload assembly; never forwarded as-is.
    #[serde(default, skip_serializing)]
    pub file_categories: Vec<FileCategory>,
}

/// Per-file verdict from the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCategory {
    #[serde(default)]
    pub upload_order: u32,
    #[serde(default)]
    pub file_name: String,
    /// `product` or `reference`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reasoning: String,
}

/// The sentinel record sent when extraction fails in any way.
#[must_use]
pub fn fallback_record() -> BriefRecord {
    BriefRecord {
        contact_name: not_provided(),
        contact_email: not_provided(),
        contact_company: not_provided(),
        contact_title: not_provided(),
        request_type: unclear(),
        service_category: unclear(),
        project_brief: "Conversation could not be properly analyzed".to_string(),
        timeline: not_provided(),
        budget: not_provided(),
        inspiration: not_provided(),
        technical_specs: not_provided(),
        model_preferences: not_provided(),
        brand_guidelines: not_provided(),
        deliverables: not_provided(),
        readiness_level: unclear(),
        engagement_level: low(),
        primary_language: unclear(),
        key_topics: "Error in analysis".to_string(),
        next_steps: "Manual review needed".to_string(),
        missing_info: "Most information needs to be collected".to_string(),
        conversation_summary: "Technical error occurred during conversation analysis".to_string(),
        file_categories: Vec::new(),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Files that rode along with user messages, in upload order.
#[must_use]
pub fn uploaded_files(history: &[StoredMessage]) -> Vec<FileRef> {
    history
        .iter()
        .filter(|m| m.role == ChatRole::User)
        .filter_map(|m| m.file.clone())
        .collect()
}

/// Slice out the first balanced JSON object, respecting strings and
/// escapes, so a reply wrapped in prose or markdown still parses.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// PROMPT
// =============================================================================

#[must_use]
pub fn build_extraction_prompt(history: &[StoredMessage], files: &[FileRef]) -> String {
    let file_list = files
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {}", i + 1, f.original_name))
        .collect::<Vec<_>>()
        .join(", ");
    let file_category_slots = files
        .iter()
        .enumerate()
        .map(|(i, f)| {
            format!(
                "{{\"uploadOrder\": {}, \"fileName\": \"{}\", \"type\": \"product|reference\", \"reasoning\": \"brief explanation\"}}",
                i + 1,
                f.original_name
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut transcript = String::new();
    for message in history {
        let role = match message.role {
            ChatRole::User => "USER",
            ChatRole::Assistant => "ASSISTANT",
            ChatRole::System => "SYSTEM",
        };
        let _ = write!(transcript, "{role}: {}\n\n", message.content);
    }

    format!(
        r#"Analyze this conversation and extract information into this EXACT JSON structure.

IMPORTANT: The conversation includes {file_count} uploaded files. Based on the conversation context, categorize each file as either:
- "product" (user's actual product they want photographed)
- "reference" (style inspiration/example they want to emulate)

Files uploaded in order: {file_list}

CRITICAL: You MUST return exactly this JSON structure with these exact field names. Never add, remove, or rename fields.

REQUIRED JSON STRUCTURE:
{{
  "contactName": "string - person's name or 'Not provided'",
  "contactEmail": "string - email address or 'Not provided'",
  "contactCompany": "string - company name or 'Not provided'",
  "contactTitle": "string - job title or 'Not provided'",
  "requestType": "meeting|proposal|test|unclear",
  "serviceCategory": "production|concepts|labs|unclear",
  "projectBrief": "string - detailed description of what they want",
  "timeline": "string - when they need it or 'Not provided'",
  "budget": "string - budget mentioned or 'Not provided'",
  "inspiration": "string - style references, brand inspirations, or aesthetic direction mentioned or 'Not provided'",
  "technicalSpecs": "string - specific technical requirements, formats, dimensions, or delivery specs or 'Not provided'",
  "modelPreferences": "string - model types, poses, styling preferences for production work or 'Not provided'",
  "brandGuidelines": "string - existing brand style, guidelines, or aesthetic requirements or 'Not provided'",
  "deliverables": "string - specific outputs needed, quantities, formats, variations or 'Not provided'",
  "readinessLevel": "browsing|interested|ready|qualified",
  "engagementLevel": "low|medium|high",
  "primaryLanguage": "en|sv",
  "keyTopics": "string - comma-separated list of main topics discussed",
  "nextSteps": "string - what should happen next",
  "missingInfo": "string - what information is still needed",
  "conversationSummary": "string - 2-3 sentence summary of the conversation",
  "fileCategories": [{file_category_slots}]
}}

FIELD DEFINITIONS:
- requestType: "meeting"=wants consultation, "proposal"=has specific project, "test"=wants samples, "unclear"=not sure
- serviceCategory: "production"=final assets, "concepts"=creative work, "labs"=AI exploration, "unclear"=not determined
- readinessLevel: "browsing"=just looking, "interested"=considering, "ready"=wants to proceed, "qualified"=serious prospect
- engagementLevel: "low"=casual interest, "medium"=asking questions, "high"=detailed discussion
- fileCategories: Categorize each uploaded file based on conversation context

Use "Not provided" for missing contact info. Use "Unclear" for classification fields when uncertain.
Be specific and detailed in projectBrief and conversationSummary.

Conversation to analyze:
{transcript}"#,
        file_count = files.len(),
    )
}

// =============================================================================
// EXTRACTOR
// =============================================================================

/// Run the extraction call. Never fails: any gateway or parse problem
/// degrades to the sentinel record.
pub async fn extract_brief(
    llm: Option<&Arc<dyn LlmChat>>,
    max_tokens: u32,
    history: &[StoredMessage],
    files: &[FileRef],
) -> BriefRecord {
    let Some(llm) = llm else {
        error!("brief extraction requested without an LLM client");
        return fallback_record();
    };

    let prompt = build_extraction_prompt(history, files);
    let messages = [Message::text("user", prompt)];
    let reply = match llm.chat(max_tokens, "", &messages).await {
        Ok(response) => response.text(),
        Err(e) => {
            error!(error = %e, "brief extraction call failed");
            return fallback_record();
        }
    };

    let Some(json) = extract_json_object(&reply) else {
        error!(reply_len = reply.len(), "no JSON object in extraction reply");
        return fallback_record();
    };
    match serde_json::from_str::<BriefRecord>(json) {
        Ok(record) => {
            info!(
                request_type = %record.request_type,
                readiness = %record.readiness_level,
                files = files.len(),
                "brief extracted"
            );
            record
        }
        Err(e) => {
            error!(error = %e, "extraction reply did not match the lead schema");
            fallback_record()
        }
    }
}

#[cfg(test)]
#[path = "brief_test.rs"]
mod tests;
