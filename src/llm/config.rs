//! Gateway configuration, split out of [`crate::config`] because it is the
//! one block that can fail at startup: a missing API key is a hard error,
//! not a default.
//!
//! The key itself is read through one level of indirection: `LLM_API_KEY_ENV`
//! names the variable that holds the secret, so `ANTHROPIC_API_KEY` and
//! `OPENAI_API_KEY` keep their conventional names in deployment env files.

use super::types::LlmError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// TYPES
// =============================================================================

/// Which gateway backs the persona. `LLM_PROVIDER`, default `anthropic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Anthropic,
    OpenAi,
}

impl LlmProviderKind {
    fn parse(raw: Option<&str>) -> Result<Self, LlmError> {
        match raw.unwrap_or("anthropic") {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(LlmError::ConfigParse(format!("unknown LLM_PROVIDER: {other}"))),
        }
    }

    /// Model used when `LLM_MODEL` is unset.
    fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-5-20250929",
            Self::OpenAi => "gpt-4o",
        }
    }
}

/// OpenAI ships two wire formats for the same job; `LLM_OPENAI_MODE`
/// selects one. Ignored for Anthropic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiApiMode {
    ChatCompletions,
    Responses,
}

impl OpenAiApiMode {
    fn parse(raw: Option<&str>) -> Result<Self, LlmError> {
        match raw.unwrap_or("responses") {
            "responses" => Ok(Self::Responses),
            "chat_completions" => Ok(Self::ChatCompletions),
            other => Err(LlmError::ConfigParse(format!(
                "unsupported openai_api mode '{other}' (expected 'responses' or 'chat_completions')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl LlmTimeouts {
    fn from_env() -> Self {
        Self {
            request_secs: env_parse_u64("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Everything a gateway client needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub api_key: String,
    pub model: String,
    pub openai_mode: OpenAiApiMode,
    /// Trailing slashes are stripped so path joins stay predictable.
    pub openai_base_url: String,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Resolve the gateway block from the environment.
    ///
    /// # Errors
    ///
    /// Fails when `LLM_API_KEY_ENV` is unset, when the variable it names is
    /// unset, or when a provider/mode value does not parse.
    pub fn from_env() -> Result<Self, LlmError> {
        let provider = LlmProviderKind::parse(std::env::var("LLM_PROVIDER").ok().as_deref())?;

        let key_var = std::env::var("LLM_API_KEY_ENV")
            .map_err(|_| LlmError::MissingApiKey { var: "LLM_API_KEY_ENV".into() })?;
        let api_key = std::env::var(&key_var).map_err(|_| LlmError::MissingApiKey { var: key_var.clone() })?;

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| provider.default_model().to_string());

        Ok(Self {
            provider,
            api_key,
            model,
            openai_mode: OpenAiApiMode::parse(std::env::var("LLM_OPENAI_MODE").ok().as_deref())?,
            openai_base_url: std::env::var("LLM_OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeouts: LlmTimeouts::from_env(),
        })
    }
}

fn env_parse_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
