use serde::{Deserialize, Serialize};
use serde_json::Value;

use polisense_common::config::LlmRoleConfig;

use super::types::{ContentBlock, LlmResponse, Message, Role, StopReason, TokenUsage};
use super::{encode_inline, LlmError};

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// Request wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
    Document { source: DocumentSource },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DocumentSource {
    Base64 { media_type: String, data: String },
    Text { media_type: String, data: String },
}

// ---------------------------------------------------------------------------
// Response wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
    #[serde(default)]
    r#type: String,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn to_wire_message(msg: &Message) -> AnthropicMessage {
    let role = match msg.role {
        Role::User => "user",
        Role::Model => "assistant",
    };

    let content = msg
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
            ContentBlock::Document { document } => {
                // Plain text goes as a text source; everything else as base64.
                let source = if document.mime_type == "text/plain" {
                    DocumentSource::Text {
                        media_type: document.mime_type.clone(),
                        data: String::from_utf8_lossy(&document.bytes).into_owned(),
                    }
                } else {
                    DocumentSource::Base64 {
                        media_type: document.mime_type.clone(),
                        data: encode_inline(&document.bytes),
                    }
                };
                AnthropicContentBlock::Document { source }
            }
        })
        .collect();

    AnthropicMessage { role, content }
}

/// No native schema support: the schema rides along in the system prompt.
fn system_with_schema(system: &str, response_schema: Option<&Value>) -> String {
    match response_schema {
        Some(schema) => format!(
            "{}\n\nRespond with a single JSON object and nothing else. It must match this schema:\n{}",
            system, schema
        ),
        None => system.to_string(),
    }
}

fn from_wire_response(resp: AnthropicResponse) -> LlmResponse {
    let text = resp
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicResponseBlock::Text { text } => Some(text),
            AnthropicResponseBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    let stop_reason = match resp.stop_reason.as_deref() {
        Some("end_turn") | Some("stop_sequence") | None => StopReason::EndTurn,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("refusal") => StopReason::Safety,
        Some(other) => StopReason::Other(other.to_string()),
    };

    LlmResponse {
        text,
        stop_reason,
        usage: TokenUsage {
            input_tokens: resp.usage.input_tokens,
            output_tokens: resp.usage.output_tokens,
        },
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Send a messages request to the Anthropic API.
pub async fn send_messages(
    http: &reqwest::Client,
    api_key: &str,
    config: &LlmRoleConfig,
    system: &str,
    messages: &[Message],
    response_schema: Option<&Value>,
) -> Result<LlmResponse, LlmError> {
    let start = std::time::Instant::now();

    let request = AnthropicRequest {
        model: &config.model,
        max_tokens: config.max_tokens,
        system: system_with_schema(system, response_schema),
        messages: messages.iter().map(to_wire_message).collect(),
        temperature: config.temperature,
    };

    let response = http
        .post(ANTHROPIC_MESSAGES_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("content-type", "application/json")
        .json(&request)
        .send()
        .await
        .map_err(|e| LlmError::Http(e.to_string()))?;

    let status = response.status();
    let latency = start.elapsed().as_secs_f64();
    metrics::histogram!("llm.api.latency", "provider" => "anthropic", "model" => config.model.clone())
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
        let msg = match serde_json::from_str::<AnthropicError>(&body) {
            Ok(e) => {
                if e.error.r#type == "invalid_request_error"
                    && e.error.message.contains("context window")
                {
                    return Err(LlmError::ContextWindowExceeded(e.error.message));
                }
                e.error.message
            }
            Err(_) => body,
        };
        return Err(LlmError::Api(format!("{}: {}", status, msg)));
    }

    let body: AnthropicResponse = response
        .json()
        .await
        .map_err(|e| LlmError::Parse(format!("Failed to parse Anthropic response: {}", e)))?;

    Ok(from_wire_response(body))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use polisense_common::types::Document;

    use super::*;

    #[test]
    fn test_parse_anthropic_text_response() {
        let json = r#"{
            "content": [{"type": "text", "text": "Hello world"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;

        let resp: AnthropicResponse = serde_json::from_str(json).unwrap();
        let parsed = from_wire_response(resp);

        assert_eq!(parsed.stop_reason, StopReason::EndTurn);
        assert_eq!(parsed.usage.input_tokens, 10);
        assert_eq!(parsed.usage.output_tokens, 5);
        assert_eq!(parsed.text, "Hello world");
    }

    #[test]
    fn test_parse_skips_non_text_blocks() {
        let json = r#"{
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Answer"}
            ],
            "stop_reason": "max_tokens",
            "usage": {"input_tokens": 1, "output_tokens": 2}
        }"#;

        let resp: AnthropicResponse = serde_json::from_str(json).unwrap();
        let parsed = from_wire_response(resp);

        assert_eq!(parsed.text, "Answer");
        assert_eq!(parsed.stop_reason, StopReason::MaxTokens);
    }

    #[test]
    fn test_document_block_wire_format() {
        let pdf = Arc::new(Document::new("a.pdf", b"%PDF".to_vec()).unwrap());
        let txt = Arc::new(Document::new("a.txt", b"plain words".to_vec()).unwrap());
        let msg = Message {
            role: Role::User,
            content: vec![
                ContentBlock::Document { document: pdf },
                ContentBlock::Document { document: txt },
                ContentBlock::Text {
                    text: "Here is the article".into(),
                },
            ],
        };

        let wire = serde_json::to_value(to_wire_message(&msg)).unwrap();
        assert_eq!(wire["role"], "user");
        assert_eq!(wire["content"][0]["type"], "document");
        assert_eq!(wire["content"][0]["source"]["type"], "base64");
        assert_eq!(wire["content"][0]["source"]["media_type"], "application/pdf");
        assert_eq!(wire["content"][0]["source"]["data"], "JVBERg==");
        assert_eq!(wire["content"][1]["source"]["type"], "text");
        assert_eq!(wire["content"][1]["source"]["data"], "plain words");
        assert_eq!(wire["content"][2]["text"], "Here is the article");
    }

    #[test]
    fn test_model_role_maps_to_assistant() {
        let wire = to_wire_message(&Message::text(Role::Model, "ready"));
        assert_eq!(wire.role, "assistant");
    }

    #[test]
    fn test_schema_appended_to_system() {
        let schema = serde_json::json!({"type": "OBJECT", "required": ["summary"]});
        let system = system_with_schema("You are an analyst.", Some(&schema));
        assert!(system.starts_with("You are an analyst."));
        assert!(system.contains("\"required\":[\"summary\"]"));
        assert_eq!(system_with_schema("plain", None), "plain");
    }
}
