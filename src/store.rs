//! Conversation store — process-wide history keyed by conversation id.
//!
//! DESIGN
//! ======
//! An explicit store abstraction instead of a module-global map: constructed
//! once at startup, injected through `AppState`, swept periodically so idle
//! conversations are evicted instead of accumulating forever. Distinct keys
//! never interfere; same-key writers go through the store's `RwLock`, so a
//! read-modify-write from two tabs can no longer drop messages.
//!
//! An optional JSON-file backup mirrors the map to disk (development
//! convenience, best-effort): loaded at init, rewritten after mutations.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{info, warn};

// =============================================================================
// MESSAGE TYPES
// =============================================================================

/// Role of a stored chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// Reference to an uploaded file, produced by the upload service.
/// Field names are the de facto wire contract; never renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub filename: String,
    #[serde(rename = "originalName")]
    pub original_name: String,
    pub size: u64,
    pub mimetype: String,
    pub url: String,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: String,
}

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
}

impl StoredMessage {
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), file: None }
    }

    #[must_use]
    pub fn with_file(role: ChatRole, content: impl Into<String>, file: FileRef) -> Self {
        Self { role, content: content.into(), file: Some(file) }
    }
}

/// An ordered, append-only conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<StoredMessage>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_activity: OffsetDateTime,
}

impl Conversation {
    #[must_use]
    fn new(id: String, now: OffsetDateTime) -> Self {
        Self { id, messages: Vec::new(), created_at: now, last_activity: now }
    }
}

/// Generate a client-compatible conversation id: time base + random hex suffix.
#[must_use]
pub fn generate_conversation_id(now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let bytes: [u8; 5] = rand::rng().random();
    let mut suffix = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(suffix, "{b:02x}");
    }
    format!("chat_{millis}_{suffix}")
}

// =============================================================================
// STORE
// =============================================================================

/// Shared conversation store. Clone is cheap — inner map is Arc-wrapped.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<RwLock<HashMap<String, Conversation>>>,
    ttl: Duration,
    backup_path: Option<PathBuf>,
}

impl ConversationStore {
    #[must_use]
    pub fn new(ttl: Duration, backup_path: Option<PathBuf>) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), ttl, backup_path }
    }

    /// Load conversations from the backup file, if configured and present.
    pub async fn load_backup(&self) {
        let Some(path) = &self.backup_path else {
            return;
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, Conversation>>(&bytes) {
                Ok(restored) => {
                    let count = restored.len();
                    let mut map = self.inner.write().await;
                    map.extend(restored);
                    info!(count, "restored conversations from backup");
                }
                Err(e) => warn!(error = %e, "conversation backup unreadable; starting empty"),
            },
            // Missing backup is normal on first run.
            Err(_) => {}
        }
    }

    /// Append messages to a conversation, creating it on first use.
    /// Returns the message count after the append.
    pub async fn append(&self, id: &str, messages: Vec<StoredMessage>, now: OffsetDateTime) -> usize {
        let len = {
            let mut map = self.inner.write().await;
            let conversation = map
                .entry(id.to_string())
                .or_insert_with(|| Conversation::new(id.to_string(), now));
            conversation.messages.extend(messages);
            conversation.last_activity = now;
            conversation.messages.len()
        };
        self.save_backup().await;
        len
    }

    /// Snapshot a conversation's full message history.
    pub async fn history(&self, id: &str) -> Vec<StoredMessage> {
        let map = self.inner.read().await;
        map.get(id).map(|c| c.messages.clone()).unwrap_or_default()
    }

    /// Message count for a conversation (0 when unknown).
    pub async fn len(&self, id: &str) -> usize {
        let map = self.inner.read().await;
        map.get(id).map_or(0, |c| c.messages.len())
    }

    /// Number of live conversations.
    pub async fn conversation_count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Drop all conversations. For tests and explicit resets.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Evict conversations idle beyond the TTL. Returns the evicted ids.
    pub async fn evict_expired(&self, now: OffsetDateTime) -> Vec<String> {
        let cutoff = now - self.ttl;
        let mut map = self.inner.write().await;
        let expired: Vec<String> = map
            .iter()
            .filter(|(_, c)| c.last_activity < cutoff)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            map.remove(id);
        }
        expired
    }

    async fn save_backup(&self) {
        let Some(path) = &self.backup_path else {
            return;
        };
        let snapshot = {
            let map = self.inner.read().await;
            map.clone()
        };
        match serde_json::to_vec_pretty(&snapshot) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(path, bytes).await {
                    warn!(error = %e, "conversation backup write failed");
                }
            }
            Err(e) => warn!(error = %e, "conversation backup serialize failed"),
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
