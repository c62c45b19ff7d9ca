//! HTTP surface — wire types, handlers, and router assembly.

pub mod audit;
pub mod brief;
pub mod chat;
pub mod session;
pub mod upload;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Error body in the widget's established shape.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), details: None }
    }

    #[must_use]
    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self { error: error.into(), details: Some(details.into()) }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

/// Assemble the full application router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    // Multipart framing overhead on top of the file itself.
    let body_limit = usize::try_from(state.config.max_upload_bytes).unwrap_or(usize::MAX).saturating_add(64 * 1024);
    let uploads_dir = state.config.uploads_dir.clone();

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/upload", post(upload::upload_handler))
        .route("/api/submit-brief", post(brief::submit_brief_handler))
        .route("/api/session-audit", post(audit::session_audit_handler))
        .route("/api/session/{id}", get(session::snapshot_handler))
        .route("/api/session/{id}/open", post(session::open_handler))
        .route("/api/session/{id}/continue", post(session::continue_handler))
        .route("/api/session/{id}/file", delete(session::clear_file_handler))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
