//! Background tasks: the session timer sweep and the conversation TTL
//! sweep.
//!
//! DESIGN
//! ======
//! One ticker drives every session's timers; firing sessions run their
//! submission on a detached task so a slow webhook never stalls the sweep.
//! A second, slower ticker evicts idle conversations and tears down their
//! sessions.

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::brief::uploaded_files;
use super::submission::{AUTO_SUBMIT_NOTE, append_confirmation, run_submission};
use crate::session::{Effect, SessionEvent};
use crate::state::AppState;
use crate::store::{ChatRole, StoredMessage};

// =============================================================================
// SESSION SWEEP
// =============================================================================

/// Drive session timers on the configured tick.
pub fn spawn_session_sweep(state: AppState) -> JoinHandle<()> {
    info!(
        tick_ms = state.config.session_tick.as_millis(),
        "session timer sweep configured"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.session_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let now = OffsetDateTime::now_utc();
            for (conversation_id, effects) in state.sessions.poll_all(now).await {
                for effect in effects {
                    match effect {
                        Effect::CountdownStarted { fires_at } => {
                            info!(%conversation_id, %fires_at, "auto-submit countdown started");
                        }
                        Effect::FireAutoSubmit => {
                            info!(%conversation_id, "auto-submit countdown reached zero");
                            let state = state.clone();
                            let id = conversation_id.clone();
                            tokio::spawn(async move {
                                run_auto_submit(&state, &id).await;
                            });
                        }
                        _ => {}
                    }
                }
            }
        }
    })
}

/// One automatic submission: note the trigger in history, extract, relay,
/// settle the session. Failures are logged and never retried.
pub async fn run_auto_submit(state: &AppState, conversation_id: &str) {
    let now = OffsetDateTime::now_utc();
    state
        .store
        .append(
            conversation_id,
            vec![StoredMessage::new(ChatRole::System, AUTO_SUBMIT_NOTE)],
            now,
        )
        .await;

    let history = state.store.history(conversation_id).await;
    let result = run_submission(state, conversation_id, &history, true).await;
    let success = result.is_ok();
    if let Err(e) = &result {
        error!(%conversation_id, error = %e, "automatic submission failed");
    }

    let settle = state
        .sessions
        .apply(
            conversation_id,
            SessionEvent::SubmitFinished { auto: true, success },
            OffsetDateTime::now_utc(),
        )
        .await;
    if let Err(e) = settle {
        warn!(%conversation_id, error = %e, "auto-submit settle rejected");
    }

    if success {
        let has_files = !uploaded_files(&history).is_empty();
        append_confirmation(state, conversation_id, true, has_files).await;
    }
}

// =============================================================================
// STORE SWEEP
// =============================================================================

/// Evict idle conversations and tear down their sessions.
pub fn spawn_store_sweep(state: AppState) -> JoinHandle<()> {
    info!(
        interval_secs = state.config.store_sweep_interval.as_secs(),
        ttl_secs = state.config.conversation_ttl.as_secs(),
        "conversation store sweep configured"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.store_sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let evicted = state.store.evict_expired(OffsetDateTime::now_utc()).await;
            for conversation_id in &evicted {
                state.sessions.remove(conversation_id).await;
            }
            if !evicted.is_empty() {
                info!(count = evicted.len(), "evicted idle conversations");
            }
        }
    })
}

#[cfg(test)]
#[path = "autosubmit_test.rs"]
mod tests;
