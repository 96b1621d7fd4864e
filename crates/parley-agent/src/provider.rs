use async_trait::async_trait;

use parley_core::config::CompletionConfig;
use parley_context::Turn;

/// Per-request knobs passed through to the backend unchanged.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    /// 0 means no client-side timeout.
    pub timeout_ms: u64,
    pub system_instruction: String,
    /// End-user identifier forwarded for abuse monitoring.
    pub user: Option<String>,
}

impl CompletionOptions {
    pub fn from_config(config: &CompletionConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout_ms: config.timeout_ms,
            system_instruction: config.system_instruction.clone(),
            user: None,
        }
    }

    pub fn for_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Choice {
    pub text: String,
}

/// Backend response. Callers use the first choice.
#[derive(Debug, Clone)]
pub struct Completion {
    pub model: String,
    pub choices: Vec<Choice>,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

impl Completion {
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.text.as_str())
    }
}

/// Common interface for completion services.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend name for logging and error messages.
    fn name(&self) -> &str;

    /// Send the full ordered turn history and wait for the reply.
    async fn complete(
        &self,
        turns: &[Turn],
        options: &CompletionOptions,
    ) -> Result<Completion, CompletionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl CompletionError {
    /// Text shown to the chat user below the error banner.
    ///
    /// Upstream API errors are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            CompletionError::Api { message, .. } => message.clone(),
            CompletionError::Unavailable(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Placeholder backend used when no API key is configured.
pub struct NullBackend;

#[async_trait]
impl CompletionBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    async fn complete(
        &self,
        _turns: &[Turn],
        _options: &CompletionOptions,
    ) -> Result<Completion, CompletionError> {
        Err(CompletionError::Unavailable(
            "no completion backend configured, set completion.api_key in parley.toml".into(),
        ))
    }
}
