use std::sync::Arc;

use serde_json::Value;

use super::request::ExplanationRequest;
use super::schema::{validate, Explanation};
use crate::llm::{LlmCaller, LlmError};

/// Issues explanation requests and validates the structured reply.
/// One attempt per call; no retries.
pub struct ExplanationClient {
    llm: Arc<dyn LlmCaller>,
}

/// Why an explanation could not be produced. Each is fatal to the report.
#[derive(Debug, thiserror::Error)]
pub enum ExplanationError {
    #[error("explanation service failed: {0}")]
    Service(#[from] LlmError),

    #[error("explanation service returned an empty body")]
    EmptyBody,

    #[error("explanation body is not JSON: {0}")]
    InvalidJson(String),

    #[error("explanation body violates schema: {}", .0.join("; "))]
    Schema(Vec<String>),
}

impl From<ExplanationError> for polisense_common::PoliSenseError {
    fn from(e: ExplanationError) -> Self {
        polisense_common::PoliSenseError::ExplanationSynthesis(e.to_string())
    }
}

impl ExplanationClient {
    pub fn new(llm: Arc<dyn LlmCaller>) -> Self {
        Self { llm }
    }

    pub async fn explain(&self, request: &ExplanationRequest) -> Result<Explanation, ExplanationError> {
        let response = self
            .llm
            .generate(&request.system, &request.messages, Some(&request.schema))
            .await?;

        tracing::debug!(
            stop_reason = ?response.stop_reason,
            output_tokens = response.usage.output_tokens,
            "Explanation response received"
        );

        parse_body(&response.text)
    }
}

/// Decode and validate a raw response body.
pub fn parse_body(body: &str) -> Result<Explanation, ExplanationError> {
    let body = strip_code_fence(body.trim());
    if body.is_empty() {
        return Err(ExplanationError::EmptyBody);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| ExplanationError::InvalidJson(e.to_string()))?;

    validate(&value).map_err(ExplanationError::Schema)
}

/// Models without native JSON mode sometimes wrap the object in a markdown fence.
fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
