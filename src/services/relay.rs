//! Submission relay — delivers assembled lead payloads to the automation
//! webhook.
//!
//! DESIGN
//! ======
//! Payload assembly is pure and lives next to the wire types so tests can
//! assert the exact JSON shape. Delivery hides behind the `BriefRelay`
//! trait; production uses a reqwest POST, tests use a recording mock.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::brief::BriefRecord;
use crate::store::FileRef;

const RELAY_TIMEOUT: Duration = Duration::from_secs(30);
const PAYLOAD_SOURCE: &str = "IM Chat Widget";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("RELAY_WEBHOOK_URL is not configured")]
    NotConfigured,
    #[error("webhook client build failed: {0}")]
    ClientBuild(String),
    #[error("webhook request failed: {0}")]
    Request(String),
    #[error("webhook rejected submission: status {status}: {body}")]
    Rejected { status: u16, body: String },
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// One uploaded file with its extraction verdict, flattened for the
/// automation (legacy and new field names both populated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedFile {
    pub file_name: String,
    pub original_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub url: String,
    pub file_url: String,
    pub size: u64,
    pub file_size: u64,
    pub mimetype: String,
    pub file_type: String,
    pub reasoning: String,
}

/// The full webhook body: lead fields at the top level plus system
/// metadata. Shape is the downstream contract; keep it stable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    #[serde(flatten)]
    pub lead: BriefRecord,
    pub conversation_id: String,
    pub timestamp: String,
    pub source: String,
    pub conversation_length: usize,
    pub extracted_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_files: Option<Vec<CategorizedFile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_image_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_reference_urls: Option<Vec<String>>,
    pub total_files: usize,
    pub product_image_count: usize,
    pub style_reference_count: usize,
    pub auto_submit: bool,
    pub email_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_upload_instructions: Option<String>,
}

/// Join the extraction verdicts onto the uploaded files and add system
/// metadata.
#[must_use]
pub fn build_payload(
    lead: BriefRecord,
    conversation_id: &str,
    files: &[FileRef],
    conversation_length: usize,
    auto_submit: bool,
    now: OffsetDateTime,
) -> SubmissionPayload {
    let categorized: Vec<CategorizedFile> = files
        .iter()
        .map(|file| {
            let verdict = lead
                .file_categories
                .iter()
                .find(|c| c.file_name == file.original_name);
            let kind = verdict.map_or("uncategorized", |c| c.kind.as_str());
            let category = match kind {
                "product" => "Product Image",
                "reference" => "Style Reference",
                _ => "Uploaded File",
            };
            CategorizedFile {
                file_name: file.original_name.clone(),
                original_name: file.original_name.clone(),
                kind: kind.to_string(),
                category: category.to_string(),
                url: file.url.clone(),
                file_url: file.url.clone(),
                size: file.size,
                file_size: file.size,
                mimetype: file.mimetype.clone(),
                file_type: file.mimetype.clone(),
                reasoning: verdict
                    .map_or_else(|| "Not categorized".to_string(), |c| c.reasoning.clone()),
            }
        })
        .collect();

    let product_urls: Vec<String> = categorized
        .iter()
        .filter(|f| f.kind == "product")
        .map(|f| f.file_url.clone())
        .collect();
    let reference_urls: Vec<String> = categorized
        .iter()
        .filter(|f| f.kind == "reference")
        .map(|f| f.file_url.clone())
        .collect();

    let timestamp = now.format(&Rfc3339).unwrap_or_default();
    let total_files = categorized.len();
    let file_upload_instructions = if total_files == 0 {
        Some(format!(
            "To send files later, email them to jacob@intelligencematters.se with subject: \
             \"Project REF: {conversation_id}\". Please specify if sending PRODUCT IMAGES \
             (your actual products) or STYLE REFERENCES (inspiration examples)."
        ))
    } else {
        None
    };

    SubmissionPayload {
        lead,
        conversation_id: conversation_id.to_string(),
        timestamp: timestamp.clone(),
        source: PAYLOAD_SOURCE.to_string(),
        conversation_length,
        extracted_at: timestamp,
        product_image_count: product_urls.len(),
        style_reference_count: reference_urls.len(),
        uploaded_files: (!categorized.is_empty()).then_some(categorized),
        product_image_urls: (!product_urls.is_empty()).then_some(product_urls),
        style_reference_urls: (!reference_urls.is_empty()).then_some(reference_urls),
        total_files,
        auto_submit,
        email_reference: format!("Project REF: {conversation_id}"),
        file_upload_instructions,
    }
}

// =============================================================================
// RELAY
// =============================================================================

/// Delivery seam so submission logic is testable without a network.
#[async_trait]
pub trait BriefRelay: Send + Sync {
    async fn deliver(&self, payload: &SubmissionPayload) -> Result<(), RelayError>;
}

/// Production relay: one JSON POST, non-2xx is a hard error.
pub struct WebhookRelay {
    http: reqwest::Client,
    url: String,
}

impl WebhookRelay {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: String) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .build()
            .map_err(|e| RelayError::ClientBuild(e.to_string()))?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl BriefRelay for WebhookRelay {
    async fn deliver(&self, payload: &SubmissionPayload) -> Result<(), RelayError> {
        let response = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| RelayError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
