//! Session audit — fire-and-forget diagnostics from the embedding page.
//!
//! Events land in a JSON file in development and nowhere else; every
//! failure is silent by design, since audit logging must never affect the
//! visitor.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Mutex;
use tracing::debug;

const MAX_AUDIT_ENTRIES: usize = 1000;

/// Diagnostic snapshot reported by the widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub message_count: Option<u64>,
    #[serde(default)]
    pub has_files: Option<bool>,
    #[serde(default)]
    pub ready_for_submit: Option<bool>,
    #[serde(default)]
    pub auto_submitted: Option<bool>,
    #[serde(default)]
    pub is_expanded: Option<bool>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditEntry {
    #[serde(flatten)]
    event: AuditEvent,
    server_timestamp: String,
}

/// File-backed audit sink. A `None` path disables persistence entirely.
#[derive(Clone)]
pub struct AuditLog {
    path: Option<PathBuf>,
    // Serializes read-modify-write cycles on the audit file.
    lock: Arc<Mutex<()>>,
}

impl AuditLog {
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path, lock: Arc::new(Mutex::new(())) }
    }

    /// Record one event. Silent on every failure.
    pub async fn record(&self, event: AuditEvent, now: OffsetDateTime) {
        debug!(
            conversation_id = event.conversation_id.as_deref().unwrap_or("-"),
            message_count = event.message_count.unwrap_or(0),
            "session audit event"
        );
        let Some(path) = &self.path else {
            return;
        };

        let entry = AuditEntry { event, server_timestamp: now.format(&Rfc3339).unwrap_or_default() };

        let _guard = self.lock.lock().await;
        let mut entries: Vec<serde_json::Value> = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        match serde_json::to_value(&entry) {
            Ok(value) => entries.push(value),
            Err(_) => return,
        }
        if entries.len() > MAX_AUDIT_ENTRIES {
            entries.drain(..entries.len() - MAX_AUDIT_ENTRIES);
        }

        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Ok(bytes) = serde_json::to_vec_pretty(&entries) {
            let _ = tokio::fs::write(path, bytes).await;
        }
    }
}

#[cfg(test)]
#[path = "audit_test.rs"]
mod tests;
