use std::sync::Arc;

use polisense_common::types::{ChatMessage, ChatRole, Document};

/// A turn in the request history.
#[derive(Clone, Debug)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

impl From<&ChatMessage> for Message {
    fn from(msg: &ChatMessage) -> Self {
        let role = match msg.role {
            ChatRole::User => Role::User,
            ChatRole::Model => Role::Model,
        };
        Message::text(role, msg.text.clone())
    }
}

/// Conversation role. Providers map `Model` to their own name ("model", "assistant").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// A content block in a message: text or an attached document.
#[derive(Clone, Debug)]
pub enum ContentBlock {
    Text { text: String },
    /// Sent inline as base64. Shared so multi-turn requests don't copy the bytes.
    Document { document: Arc<Document> },
}

/// Parsed response from a generative call.
#[derive(Clone, Debug)]
pub struct LlmResponse {
    /// All text parts joined. Empty when the model produced no text.
    pub text: String,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

/// Why the model stopped generating.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Safety,
    Other(String),
}

/// Token usage from a single API call.
#[derive(Clone, Debug, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
