use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

/// Who authored a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One entry of a session transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    /// Synthetic display-only message seeding an empty or cleared transcript.
    pub fn sentinel(text: &str) -> Self {
        Self {
            id: MessageId::SENTINEL,
            role: ChatRole::Model,
            text: text.to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id.is_sentinel()
    }
}
