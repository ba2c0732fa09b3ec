mod anthropic;
mod gemini;
pub mod types;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;

use polisense_common::config::LlmRoleConfig;

pub use types::{ContentBlock, LlmResponse, Message, Role, StopReason, TokenUsage};

/// Generative API client with provider dispatch.
///
/// Performs exactly one attempt per call. Retry policy belongs to the caller.
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmRoleConfig,
    api_key: String,
}

/// Errors from generative API calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM HTTP error: {0}")]
    Http(String),

    #[error("LLM auth error: {0}")]
    Auth(String),

    #[error("LLM rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("LLM context window exceeded: {0}")]
    ContextWindowExceeded(String),

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("LLM response parse error: {0}")]
    Parse(String),
}

impl LlmError {
    /// Whether a caller-side retry could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::Auth(_) | LlmError::ContextWindowExceeded(_))
    }
}

impl LlmClient {
    /// Create a new client for one role.
    /// Reads the API key from the appropriate env var based on provider.
    /// Returns None if the key is not set.
    pub fn new(config: LlmRoleConfig) -> Option<Self> {
        let env_var = match config.provider.as_str() {
            "gemini" => "GEMINI_API_KEY",
            "anthropic" => "ANTHROPIC_API_KEY",
            other => {
                tracing::warn!(provider = other, "Unknown LLM provider");
                return None;
            }
        };

        let api_key = match std::env::var(env_var) {
            Ok(key) if !key.is_empty() => key,
            _ => {
                tracing::warn!(
                    env_var = env_var,
                    provider = config.provider.as_str(),
                    "API key not set, LLM client disabled for this role"
                );
                return None;
            }
        };

        let http = match reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
        {
            Ok(http) => http,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build LLM HTTP client");
                return None;
            }
        };

        Some(Self {
            http,
            config,
            api_key,
        })
    }

    pub fn provider(&self) -> &str {
        &self.config.provider
    }

    /// Send one generation request to the configured provider.
    ///
    /// `response_schema`, when given, constrains the reply to a JSON object.
    pub async fn generate(
        &self,
        system: &str,
        messages: &[Message],
        response_schema: Option<&Value>,
    ) -> Result<LlmResponse, LlmError> {
        let result = match self.config.provider.as_str() {
            "gemini" => {
                gemini::generate_content(
                    &self.http,
                    &self.api_key,
                    &self.config,
                    system,
                    messages,
                    response_schema,
                )
                .await
            }
            "anthropic" => {
                anthropic::send_messages(
                    &self.http,
                    &self.api_key,
                    &self.config,
                    system,
                    messages,
                    response_schema,
                )
                .await
            }
            other => Err(LlmError::Api(format!("Unknown provider: {}", other))),
        };

        match &result {
            Ok(response) => {
                metrics::counter!("llm.api.input_tokens", "provider" => self.config.provider.clone())
                    .increment(response.usage.input_tokens);
                metrics::counter!("llm.api.output_tokens", "provider" => self.config.provider.clone())
                    .increment(response.usage.output_tokens);
            }
            Err(e) => {
                tracing::warn!(provider = %self.config.provider, error = %e, "LLM call failed");
                metrics::counter!("llm.api.errors", "provider" => self.config.provider.clone())
                    .increment(1);
            }
        }

        result
    }
}

/// Object-safe trait for testability (dyn dispatch).
/// Tests provide mock callers; production uses LlmClient.
pub trait LlmCaller: Send + Sync {
    fn generate<'a>(
        &'a self,
        system: &'a str,
        messages: &'a [Message],
        response_schema: Option<&'a Value>,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>>;
}

impl LlmCaller for LlmClient {
    fn generate<'a>(
        &'a self,
        system: &'a str,
        messages: &'a [Message],
        response_schema: Option<&'a Value>,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.generate(system, messages, response_schema))
    }
}

/// Base64 payload for an inline attachment.
fn encode_inline(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
