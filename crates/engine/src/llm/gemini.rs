use serde::{Deserialize, Serialize};
use serde_json::Value;

use polisense_common::config::LlmRoleConfig;

use super::types::{ContentBlock, LlmResponse, Message, Role, StopReason, TokenUsage};
use super::{encode_inline, LlmError};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ---------------------------------------------------------------------------
// Request wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

// ---------------------------------------------------------------------------
// Response wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn to_wire_content(msg: &Message) -> GeminiContent {
    let role = match msg.role {
        Role::User => "user",
        Role::Model => "model",
    };

    let parts = msg
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => GeminiPart::Text { text: text.clone() },
            ContentBlock::Document { document } => GeminiPart::InlineData {
                inline_data: InlineData {
                    mime_type: document.mime_type.clone(),
                    data: encode_inline(&document.bytes),
                },
            },
        })
        .collect();

    GeminiContent {
        role: Some(role),
        parts,
    }
}

fn from_wire_response(resp: GenerateContentResponse) -> LlmResponse {
    let candidate = resp.candidates.into_iter().next();

    let (text, finish_reason) = match candidate {
        Some(c) => {
            let text = c
                .content
                .map(|content| {
                    content
                        .parts
                        .into_iter()
                        .filter_map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();
            (text, c.finish_reason)
        }
        None => (String::new(), None),
    };

    let stop_reason = match finish_reason.as_deref() {
        Some("STOP") | None => StopReason::EndTurn,
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some("SAFETY") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => StopReason::Safety,
        Some(other) => StopReason::Other(other.to_string()),
    };

    let usage = resp
        .usage_metadata
        .map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    LlmResponse {
        text,
        stop_reason,
        usage,
    }
}

fn build_request(
    config: &LlmRoleConfig,
    system: &str,
    messages: &[Message],
    response_schema: Option<&Value>,
) -> GenerateContentRequest {
    let system_instruction = (!system.is_empty()).then(|| GeminiContent {
        role: None,
        parts: vec![GeminiPart::Text {
            text: system.to_string(),
        }],
    });

    GenerateContentRequest {
        contents: messages.iter().map(to_wire_content).collect(),
        system_instruction,
        generation_config: GenerationConfig {
            max_output_tokens: config.max_tokens,
            temperature: config.temperature,
            response_mime_type: response_schema.map(|_| "application/json"),
            response_schema: response_schema.cloned(),
        },
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Send a generateContent request to the Gemini API.
pub async fn generate_content(
    http: &reqwest::Client,
    api_key: &str,
    config: &LlmRoleConfig,
    system: &str,
    messages: &[Message],
    response_schema: Option<&Value>,
) -> Result<LlmResponse, LlmError> {
    generate_content_at(
        http,
        GEMINI_BASE_URL,
        api_key,
        config,
        system,
        messages,
        response_schema,
    )
    .await
}

async fn generate_content_at(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    config: &LlmRoleConfig,
    system: &str,
    messages: &[Message],
    response_schema: Option<&Value>,
) -> Result<LlmResponse, LlmError> {
    let start = std::time::Instant::now();

    let request = build_request(config, system, messages, response_schema);
    let model = config.model.trim_start_matches("models/");
    let url = format!("{}/models/{}:generateContent", base_url, model);

    let response = http
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| LlmError::Http(e.to_string()))?;

    let status = response.status();
    let latency = start.elapsed().as_secs_f64();
    metrics::histogram!("llm.api.latency", "provider" => "gemini", "model" => model.to_string())
        .record(latency);

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Auth(format!("{}: {}", status, body)));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(LlmError::RateLimited { retry_after });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let msg = match serde_json::from_str::<GeminiError>(&body) {
            Ok(e) => {
                if e.error.status == "INVALID_ARGUMENT" && e.error.message.contains("token") {
                    return Err(LlmError::ContextWindowExceeded(e.error.message));
                }
                e.error.message
            }
            Err(_) => body,
        };
        return Err(LlmError::Api(format!("{}: {}", status, msg)));
    }

    let body: GenerateContentResponse = response
        .json()
        .await
        .map_err(|e| LlmError::Parse(format!("Failed to parse Gemini response: {}", e)))?;

    Ok(from_wire_response(body))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
