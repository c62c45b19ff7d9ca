//! Shared application state injected into every handler.
//!
//! DESIGN
//! ======
//! One `AppState` assembled at startup and cloned into handlers via axum's
//! `State` extractor. The LLM client and relay are optional: the service
//! starts without either and degrades (apology replies, failed
//! submissions) instead of refusing to boot.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::LlmChat;
use crate::readiness::{AssessReadiness, KeywordHeuristic};
use crate::services::audit::AuditLog;
use crate::services::relay::BriefRelay;
use crate::sessions::SessionRegistry;
use crate::store::ConversationStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: ConversationStore,
    pub sessions: SessionRegistry,
    pub llm: Option<Arc<dyn LlmChat>>,
    pub relay: Option<Arc<dyn BriefRelay>>,
    pub readiness: Arc<dyn AssessReadiness>,
    pub audit: AuditLog,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        llm: Option<Arc<dyn LlmChat>>,
        relay: Option<Arc<dyn BriefRelay>>,
    ) -> Self {
        let store = ConversationStore::new(config.conversation_ttl, config.conversation_backup_path.clone());
        let sessions = SessionRegistry::new(
            config.auto_submit_idle,
            config.auto_submit_countdown,
            config.typewriter_base,
        );
        let readiness: Arc<dyn AssessReadiness> = Arc::new(KeywordHeuristic::new(
            config.readiness_min_messages,
            config.readiness_keywords.clone(),
        ));
        let audit = AuditLog::new(config.session_audit_path.clone());
        Self { config: Arc::new(config), store, sessions, llm, relay, readiness, audit }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
