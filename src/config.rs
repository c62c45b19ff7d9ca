//! Application configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Environment variables only, parsed once at startup into a typed struct.
//! Unset or unparsable values fall back to defaults with a warning, so a
//! bare `cargo run` always starts. The LLM block lives in `llm::config`;
//! this covers everything else.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_AUTO_SUBMIT_IDLE_SECS: u64 = 120;
pub const DEFAULT_AUTO_SUBMIT_COUNTDOWN_SECS: u64 = 120;
pub const DEFAULT_READINESS_MIN_MESSAGES: usize = 8;
pub const DEFAULT_READINESS_KEYWORDS: &str = "brief,project,shoot,submit";
pub const DEFAULT_CONVERSATION_TTL_SECS: u64 = 86_400;
pub const DEFAULT_STORE_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_SESSION_TICK_MS: u64 = 1000;
pub const DEFAULT_TYPEWRITER_BASE_MS: u64 = 30;
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 300;
pub const DEFAULT_EXTRACT_MAX_TOKENS: u32 = 1500;

const DEFAULT_BACKUP_PATH: &str = "conversation-backup.json";
const DEFAULT_AUDIT_PATH: &str = "logs/session-audits.json";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

/// Everything the service reads from the environment, minus the LLM block.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub app_env: AppEnv,
    pub relay_webhook_url: Option<String>,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub auto_submit_idle: Duration,
    pub auto_submit_countdown: Duration,
    pub readiness_min_messages: usize,
    pub readiness_keywords: Vec<String>,
    pub conversation_ttl: Duration,
    pub store_sweep_interval: Duration,
    pub session_tick: Duration,
    pub typewriter_base: Duration,
    /// File mirror of the conversation map. Development convenience.
    pub conversation_backup_path: Option<PathBuf>,
    /// File sink for session audit events. Development convenience.
    pub session_audit_path: Option<PathBuf>,
    pub llm_max_tokens: u32,
    pub extract_max_tokens: u32,
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let app_env = match std::env::var("APP_ENV").as_deref() {
            Ok("production" | "prod") => AppEnv::Production,
            _ => AppEnv::Development,
        };

        let relay_webhook_url = std::env::var("RELAY_WEBHOOK_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        if relay_webhook_url.is_none() {
            warn!("RELAY_WEBHOOK_URL not set; brief submissions will fail");
        }

        let keywords = std::env::var("READINESS_KEYWORDS")
            .unwrap_or_else(|_| DEFAULT_READINESS_KEYWORDS.to_string())
            .split(',')
            .map(str::to_string)
            .collect();

        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            app_env,
            relay_webhook_url,
            uploads_dir: PathBuf::from(
                std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string()),
            ),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            auto_submit_idle: Duration::from_secs(env_parse(
                "AUTO_SUBMIT_IDLE_SECS",
                DEFAULT_AUTO_SUBMIT_IDLE_SECS,
            )),
            auto_submit_countdown: Duration::from_secs(env_parse(
                "AUTO_SUBMIT_COUNTDOWN_SECS",
                DEFAULT_AUTO_SUBMIT_COUNTDOWN_SECS,
            )),
            readiness_min_messages: env_parse("READINESS_MIN_MESSAGES", DEFAULT_READINESS_MIN_MESSAGES),
            readiness_keywords: keywords,
            conversation_ttl: Duration::from_secs(env_parse(
                "CONVERSATION_TTL_SECS",
                DEFAULT_CONVERSATION_TTL_SECS,
            )),
            store_sweep_interval: Duration::from_secs(env_parse(
                "STORE_SWEEP_INTERVAL_SECS",
                DEFAULT_STORE_SWEEP_INTERVAL_SECS,
            )),
            session_tick: Duration::from_millis(env_parse("SESSION_TICK_MS", DEFAULT_SESSION_TICK_MS)),
            typewriter_base: Duration::from_millis(env_parse(
                "TYPEWRITER_BASE_MS",
                DEFAULT_TYPEWRITER_BASE_MS,
            )),
            conversation_backup_path: dev_path("CONVERSATION_BACKUP_PATH", DEFAULT_BACKUP_PATH, app_env),
            session_audit_path: dev_path("SESSION_AUDIT_PATH", DEFAULT_AUDIT_PATH, app_env),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", DEFAULT_LLM_MAX_TOKENS),
            extract_max_tokens: env_parse("EXTRACT_MAX_TOKENS", DEFAULT_EXTRACT_MAX_TOKENS),
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Parse an env var, falling back to `default` when unset or unparsable.
fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(%name, %raw, "unparsable env var; using default");
            default
        }),
        Err(_) => default,
    }
}

/// File paths that default on in development and off in production.
fn dev_path(name: &str, default: &str, app_env: AppEnv) -> Option<PathBuf> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => Some(PathBuf::from(raw)),
        _ if app_env.is_development() => Some(PathBuf::from(default)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
