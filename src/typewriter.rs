//! Typewriter — paced reveal of assistant replies.
//!
//! DESIGN
//! ======
//! The pacing schedule is a pure function over the text so it can be tested
//! without a runtime. The async driver sleeps through the schedule on tokio
//! time, publishing the revealed prefix length through a `watch` channel and
//! running a completion callback at the end. At most one reveal runs per
//! conversation; the session registry aborts the previous handle before
//! starting a new one.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

// =============================================================================
// SCHEDULE
// =============================================================================

/// Per-character delays for revealing `text`. The pause lands before each
/// character: longer after sentence punctuation, shorter through spaces.
#[must_use]
pub fn reveal_delays(text: &str, base: Duration) -> Vec<Duration> {
    let mut delays = Vec::new();
    let mut prev: Option<char> = None;
    for ch in text.chars() {
        let delay = match prev {
            Some('.' | '!' | '?') => base * 3,
            Some(',' | ';') => base * 2,
            _ if ch == ' ' => base / 2,
            _ => base,
        };
        delays.push(delay);
        prev = Some(ch);
    }
    delays
}

// =============================================================================
// DRIVER
// =============================================================================

/// Handle to a running reveal. Dropping it does not stop the task; call
/// [`RevealHandle::cancel`].
pub struct RevealHandle {
    task: JoinHandle<()>,
    progress: watch::Receiver<usize>,
    total: usize,
}

impl RevealHandle {
    /// Characters revealed so far.
    #[must_use]
    pub fn revealed(&self) -> usize {
        *self.progress.borrow()
    }

    /// Total characters in the reply being revealed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the reveal. Idempotent; aborting a finished task is a no-op.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

/// Start revealing `text` on tokio time. `on_complete` runs once, only if
/// the reveal reaches the end without being cancelled.
pub fn spawn_reveal<F>(text: &str, base: Duration, on_complete: F) -> RevealHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let delays = reveal_delays(text, base);
    let total = delays.len();
    let (tx, rx) = watch::channel(0usize);

    let task = tokio::spawn(async move {
        for (i, delay) in delays.into_iter().enumerate() {
            tokio::time::sleep(delay).await;
            // Receiver may be gone after teardown; keep revealing anyway so
            // on_complete still runs.
            let _ = tx.send(i + 1);
        }
        on_complete.await;
    });

    RevealHandle { task, progress: rx, total }
}

#[cfg(test)]
#[path = "typewriter_test.rs"]
mod tests;
