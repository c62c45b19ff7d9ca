//! Session state machine — per-conversation widget lifecycle and auto-submit
//! timers.
//!
//! DESIGN
//! ======
//! An explicit finite-state machine instead of scattered timer flags. All
//! transitions go through `apply(event, now)` or `poll(now)` with the clock
//! injected, so every timing rule is testable without sleeping. The machine
//! is pure: it returns `Effect` values and never performs IO itself; the
//! registry in `sessions.rs` turns effects into reveals, submissions, and
//! log lines.
//!
//! TIMER MODEL
//! ===========
//! At most one armed deadline exists at a time, carried inside the phase
//! (`AutoSubmitArmed` holds the idle expiry, `Countdown` holds the fire
//! instant). Arming always replaces the previous chain; any user activity
//! disarms it. `has_auto_submitted` is monotonic: once an automatic
//! submission succeeds the machine never re-arms, though manual interaction
//! stays available.

use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;

use crate::store::FileRef;

// =============================================================================
// TYPES
// =============================================================================

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Widget closed; nothing sent yet.
    Collapsed,
    /// Widget open, idle, no pending work.
    Expanded,
    /// One LLM turn in flight. A second send is rejected until it resolves.
    AwaitingReply,
    /// Assistant reply arriving character by character.
    Revealing,
    /// Brief is ready; manual submit available, no deadline armed.
    SubmitOffered,
    /// Idle deadline armed. When it expires the countdown begins.
    AutoSubmitArmed { countdown_at: OffsetDateTime },
    /// Countdown running. At zero the brief submits itself.
    Countdown { fires_at: OffsetDateTime },
    /// Submission (manual or automatic) in flight.
    Submitting,
}

impl Phase {
    /// Wire name for session snapshots.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Collapsed => "collapsed",
            Self::Expanded => "expanded",
            Self::AwaitingReply => "awaiting_reply",
            Self::Revealing => "revealing",
            Self::SubmitOffered => "submit_offered",
            Self::AutoSubmitArmed { .. } => "auto_submit_armed",
            Self::Countdown { .. } => "countdown",
            Self::Submitting => "submitting",
        }
    }
}

/// Inputs to the machine. Everything user- or service-initiated arrives
/// here; time-driven promotion happens in [`Session::poll`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Widget opened (first user interaction).
    Opened,
    /// A user message was accepted and the LLM turn is starting.
    SendStarted,
    /// The assistant reply arrived. `ready` carries the submit-readiness
    /// verdict for this turn (marker or heuristic).
    ReplyReceived { ready: bool },
    /// The typewriter reveal for the current reply finished.
    RevealFinished,
    /// An upload completed and is staged for the next send.
    FileStaged(FileRef),
    /// The staged upload was discarded without sending.
    FileCleared,
    /// The visitor chose to keep chatting; stop the countdown.
    CancelAutoSubmit,
    /// The visitor pressed submit.
    ManualSubmitStarted,
    /// A submission resolved.
    SubmitFinished { auto: bool, success: bool },
    /// The request driving an in-flight turn or submission was dropped
    /// (client disconnect) before it could report an outcome.
    TurnAborted,
}

/// Side effects the caller must carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The widget changed size; notify the embedding page.
    NotifyResize { expanded: bool },
    /// Abort any in-flight reveal for this conversation.
    CancelReveal,
    /// Begin revealing the newest assistant reply.
    StartReveal,
    /// The idle deadline expired; the visible countdown starts now.
    CountdownStarted { fires_at: OffsetDateTime },
    /// The armed chain was torn down before firing.
    CountdownCancelled,
    /// The countdown reached zero; run the automatic submission.
    FireAutoSubmit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a reply is already in flight for this conversation")]
    TurnInFlight,
    #[error("session is not ready to submit")]
    NotReadyToSubmit,
}

// =============================================================================
// SESSION
// =============================================================================

/// Per-conversation state machine. Pure; the clock is always a parameter.
#[derive(Debug, Clone)]
pub struct Session {
    phase: Phase,
    ready: bool,
    has_auto_submitted: bool,
    staged_file: Option<FileRef>,
    idle: Duration,
    countdown: Duration,
}

impl Session {
    #[must_use]
    pub fn new(idle: Duration, countdown: Duration) -> Self {
        Self {
            phase: Phase::Collapsed,
            ready: false,
            has_auto_submitted: false,
            staged_file: None,
            idle,
            countdown,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        !matches!(self.phase, Phase::Collapsed)
    }

    /// Manual submit is offered whenever the brief is ready, armed or not.
    #[must_use]
    pub fn submit_offered(&self) -> bool {
        matches!(
            self.phase,
            Phase::SubmitOffered | Phase::AutoSubmitArmed { .. } | Phase::Countdown { .. }
        )
    }

    #[must_use]
    pub fn has_auto_submitted(&self) -> bool {
        self.has_auto_submitted
    }

    #[must_use]
    pub fn staged_file(&self) -> Option<&FileRef> {
        self.staged_file.as_ref()
    }

    /// Detach the staged file so it rides along with the next send.
    pub fn take_staged_file(&mut self) -> Option<FileRef> {
        self.staged_file.take()
    }

    /// Seconds left on a running countdown, rounded up. `None` when no
    /// countdown is visible.
    #[must_use]
    pub fn seconds_remaining(&self, now: OffsetDateTime) -> Option<u64> {
        match self.phase {
            Phase::Countdown { fires_at } => {
                let remaining = (fires_at - now).whole_milliseconds();
                if remaining <= 0 {
                    Some(0)
                } else {
                    let millis = u64::try_from(remaining).unwrap_or(0);
                    Some(millis.div_ceil(1000))
                }
            }
            _ => None,
        }
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Apply one event. Returns the effects the caller must execute.
    ///
    /// # Errors
    ///
    /// `TurnInFlight` when a send arrives while a reply or submission is
    /// pending; `NotReadyToSubmit` for a manual submit outside an offered
    /// phase.
    pub fn apply(&mut self, event: SessionEvent, now: OffsetDateTime) -> Result<Vec<Effect>, SessionError> {
        let mut effects = Vec::new();
        match event {
            SessionEvent::Opened => {
                if matches!(self.phase, Phase::Collapsed) {
                    self.phase = Phase::Expanded;
                    effects.push(Effect::NotifyResize { expanded: true });
                }
            }

            SessionEvent::SendStarted => {
                if matches!(self.phase, Phase::AwaitingReply | Phase::Submitting) {
                    return Err(SessionError::TurnInFlight);
                }
                if matches!(self.phase, Phase::Collapsed) {
                    effects.push(Effect::NotifyResize { expanded: true });
                }
                if matches!(self.phase, Phase::Revealing) {
                    effects.push(Effect::CancelReveal);
                }
                self.disarm(&mut effects);
                self.phase = Phase::AwaitingReply;
            }

            SessionEvent::ReplyReceived { ready } => {
                self.ready = ready;
                self.phase = Phase::Revealing;
                effects.push(Effect::StartReveal);
            }

            SessionEvent::RevealFinished => {
                if matches!(self.phase, Phase::Revealing) {
                    self.settle_after_turn(now);
                }
            }

            SessionEvent::FileStaged(file) => {
                self.staged_file = Some(file);
                self.disarm(&mut effects);
            }

            SessionEvent::FileCleared => {
                self.staged_file = None;
                self.disarm(&mut effects);
            }

            SessionEvent::CancelAutoSubmit => {
                self.disarm(&mut effects);
            }

            SessionEvent::ManualSubmitStarted => {
                if !self.submit_offered() {
                    return Err(SessionError::NotReadyToSubmit);
                }
                self.disarm(&mut effects);
                self.phase = Phase::Submitting;
            }

            SessionEvent::SubmitFinished { auto, success } => {
                if success {
                    if auto {
                        self.has_auto_submitted = true;
                    }
                    self.ready = false;
                    self.phase = Phase::Expanded;
                } else {
                    // Manual failures surface to the caller; auto failures
                    // are logged. Either way the offer stays on screen.
                    self.phase = Phase::SubmitOffered;
                }
            }

            SessionEvent::TurnAborted => {
                // The machine must never stay stuck awaiting an outcome that
                // will no longer arrive.
                if matches!(self.phase, Phase::AwaitingReply | Phase::Submitting) {
                    self.phase = if self.ready { Phase::SubmitOffered } else { Phase::Expanded };
                }
            }
        }
        Ok(effects)
    }

    /// Time-driven promotion, called on a fixed cadence by the sweep task.
    pub fn poll(&mut self, now: OffsetDateTime) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.phase {
            Phase::AutoSubmitArmed { countdown_at } if now >= countdown_at => {
                let fires_at = now + self.countdown;
                self.phase = Phase::Countdown { fires_at };
                effects.push(Effect::CountdownStarted { fires_at });
            }
            Phase::Countdown { fires_at } if now >= fires_at => {
                self.phase = Phase::Submitting;
                effects.push(Effect::FireAutoSubmit);
            }
            _ => {}
        }
        effects
    }

    /// Decide where to land after a completed turn: arm the idle deadline
    /// when the brief is ready and nothing auto-submitted yet.
    fn settle_after_turn(&mut self, now: OffsetDateTime) {
        if self.ready {
            if self.has_auto_submitted {
                self.phase = Phase::SubmitOffered;
            } else {
                self.phase = Phase::AutoSubmitArmed { countdown_at: now + self.idle };
            }
        } else {
            self.phase = Phase::Expanded;
        }
    }

    /// Tear down the armed chain. Idempotent: disarming an unarmed session
    /// is a no-op and emits nothing.
    fn disarm(&mut self, effects: &mut Vec<Effect>) {
        match self.phase {
            Phase::AutoSubmitArmed { .. } | Phase::Countdown { .. } => {
                self.phase = Phase::SubmitOffered;
                effects.push(Effect::CountdownCancelled);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
