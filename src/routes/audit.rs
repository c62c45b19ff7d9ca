//! `POST /api/session-audit` — fire-and-forget widget diagnostics.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use time::OffsetDateTime;

use crate::services::audit::AuditEvent;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AuditResponseBody {
    pub success: bool,
}

pub async fn session_audit_handler(
    State(state): State<AppState>,
    Json(event): Json<AuditEvent>,
) -> Json<AuditResponseBody> {
    state.audit.record(event, OffsetDateTime::now_utc()).await;
    Json(AuditResponseBody { success: true })
}
