//! Readiness — decides when a conversation has enough substance to offer
//! auto-submit.
//!
//! DESIGN
//! ======
//! A trait seam with one production impl. The heuristic is deliberately cheap
//! and local (no LLM call): enough messages, contact details present, and the
//! assistant has steered toward deliverables. Tests swap in fixed verdicts.

use crate::store::{ChatRole, StoredMessage};

/// Verdict on whether a conversation is worth auto-submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessSignal {
    pub ready: bool,
    pub has_email: bool,
    pub has_project_context: bool,
    pub message_count: usize,
}

/// Seam for readiness assessment so session plumbing can be tested with
/// canned verdicts.
pub trait AssessReadiness: Send + Sync {
    fn assess(&self, history: &[StoredMessage]) -> ReadinessSignal;
}

// =============================================================================
// KEYWORD HEURISTIC
// =============================================================================

/// Production heuristic: minimum depth, a user-supplied email-ish token, and
/// a project keyword in an assistant turn.
pub struct KeywordHeuristic {
    min_messages: usize,
    keywords: Vec<String>,
}

impl KeywordHeuristic {
    #[must_use]
    pub fn new(min_messages: usize, keywords: Vec<String>) -> Self {
        let keywords = keywords
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { min_messages, keywords }
    }
}

impl AssessReadiness for KeywordHeuristic {
    fn assess(&self, history: &[StoredMessage]) -> ReadinessSignal {
        let message_count = history.len();
        let has_email = history
            .iter()
            .any(|m| m.role == ChatRole::User && m.content.contains('@'));
        let has_project_context = history.iter().any(|m| {
            if m.role != ChatRole::Assistant {
                return false;
            }
            let content = m.content.to_lowercase();
            self.keywords.iter().any(|k| content.contains(k.as_str()))
        });

        ReadinessSignal {
            ready: message_count >= self.min_messages && has_email && has_project_context,
            has_email,
            has_project_context,
            message_count,
        }
    }
}

#[cfg(test)]
#[path = "readiness_test.rs"]
mod tests;
