//! Session registry — holds every live session and drives its effects.
//!
//! DESIGN
//! ======
//! The state machine in `session.rs` is pure; this module owns the mutable
//! map, executes reveal effects, and feeds `RevealFinished` back into the
//! machine when a typewriter task completes. `FireAutoSubmit` effects are
//! returned to the caller (the auto-submit sweep) rather than executed here,
//! because submission needs the chat/brief services.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use crate::session::{Effect, Session, SessionError, SessionEvent};
use crate::store::FileRef;
use crate::typewriter::{RevealHandle, spawn_reveal};

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Read-only view for `GET /api/session/{id}`. Everything an embedding page
/// needs to render the widget chrome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: &'static str,
    pub expanded: bool,
    pub ready_for_submit: bool,
    pub auto_submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<u64>,
    pub revealed_chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staged_file: Option<FileRef>,
}

// =============================================================================
// REGISTRY
// =============================================================================

struct SessionEntry {
    session: Session,
    reveal: Option<RevealHandle>,
}

/// Shared session map. Clone is cheap.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
    idle: Duration,
    countdown: Duration,
    reveal_base: Duration,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(idle: Duration, countdown: Duration, reveal_base: Duration) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), idle, countdown, reveal_base }
    }

    /// Apply an event to a conversation's session, creating the session on
    /// first touch. Reveal-cancellation effects are executed here; the rest
    /// come back to the caller.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError`] from the state machine untouched.
    pub async fn apply(
        &self,
        conversation_id: &str,
        event: SessionEvent,
        now: OffsetDateTime,
    ) -> Result<Vec<Effect>, SessionError> {
        let mut map = self.inner.write().await;
        let entry = map
            .entry(conversation_id.to_string())
            .or_insert_with(|| SessionEntry {
                session: Session::new(self.idle, self.countdown),
                reveal: None,
            });
        let effects = entry.session.apply(event, now)?;
        for effect in &effects {
            match effect {
                Effect::CancelReveal => {
                    if let Some(handle) = entry.reveal.take() {
                        handle.cancel();
                    }
                }
                Effect::CountdownStarted { .. } | Effect::CountdownCancelled => {
                    debug!(%conversation_id, ?effect, "session timer transition");
                }
                _ => {}
            }
        }
        Ok(effects)
    }

    /// Start the typewriter for the newest assistant reply. Any reveal still
    /// running for this conversation is aborted first; its completion will
    /// then never fire.
    pub async fn begin_reveal(&self, conversation_id: &str, text: &str) {
        let registry = self.clone();
        let id = conversation_id.to_string();
        let handle = spawn_reveal(text, self.reveal_base, async move {
            let _ = registry
                .apply(&id, SessionEvent::RevealFinished, OffsetDateTime::now_utc())
                .await;
        });

        let mut map = self.inner.write().await;
        if let Some(entry) = map.get_mut(conversation_id) {
            if let Some(old) = entry.reveal.replace(handle) {
                old.cancel();
            }
        } else {
            // Session evicted between reply and reveal; nothing to animate.
            handle.cancel();
        }
    }

    /// Detach the staged file for a send.
    pub async fn take_staged_file(&self, conversation_id: &str) -> Option<FileRef> {
        let mut map = self.inner.write().await;
        map.get_mut(conversation_id)
            .and_then(|e| e.session.take_staged_file())
    }

    /// Advance every session's timers. Returns per-conversation effects;
    /// the caller acts on `FireAutoSubmit`.
    pub async fn poll_all(&self, now: OffsetDateTime) -> Vec<(String, Vec<Effect>)> {
        let mut map = self.inner.write().await;
        map.iter_mut()
            .filter_map(|(id, entry)| {
                let effects = entry.session.poll(now);
                if effects.is_empty() {
                    None
                } else {
                    Some((id.clone(), effects))
                }
            })
            .collect()
    }

    pub async fn snapshot(&self, conversation_id: &str, now: OffsetDateTime) -> Option<SessionSnapshot> {
        let map = self.inner.read().await;
        let entry = map.get(conversation_id)?;
        Some(SessionSnapshot {
            phase: entry.session.phase().name(),
            expanded: entry.session.is_expanded(),
            ready_for_submit: entry.session.submit_offered(),
            auto_submitted: entry.session.has_auto_submitted(),
            seconds_remaining: entry.session.seconds_remaining(now),
            revealed_chars: entry.reveal.as_ref().map_or(0, RevealHandle::revealed),
            staged_file: entry.session.staged_file().cloned(),
        })
    }

    /// Tear a session down, aborting any in-flight reveal.
    pub async fn remove(&self, conversation_id: &str) {
        let mut map = self.inner.write().await;
        if let Some(entry) = map.remove(conversation_id) {
            if let Some(handle) = entry.reveal {
                handle.cancel();
            }
        }
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Arm a guard for an in-flight turn or submission. If the request
    /// future is dropped (client disconnect) before [`InFlightGuard::disarm`]
    /// is called, the guard feeds `TurnAborted` back into the machine so the
    /// session returns to an interactive phase instead of rejecting every
    /// later send.
    #[must_use]
    pub fn guard_in_flight(&self, conversation_id: &str) -> InFlightGuard {
        InFlightGuard {
            registry: self.clone(),
            conversation_id: conversation_id.to_string(),
            armed: true,
        }
    }
}

// =============================================================================
// IN-FLIGHT GUARD
// =============================================================================

/// Reverts `AwaitingReply`/`Submitting` when the owning request future is
/// dropped before the outcome was recorded.
pub struct InFlightGuard {
    registry: SessionRegistry,
    conversation_id: String,
    armed: bool,
}

impl InFlightGuard {
    /// The outcome was recorded through a real event; the guard stands down.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Drop is synchronous; the recovery event runs on a detached task.
        let registry = self.registry.clone();
        let conversation_id = std::mem::take(&mut self.conversation_id);
        tokio::spawn(async move {
            debug!(%conversation_id, "request dropped mid-turn; recovering session");
            let _ = registry
                .apply(&conversation_id, SessionEvent::TurnAborted, OffsetDateTime::now_utc())
                .await;
        });
    }
}

#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;
