use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace for document-derived session ids. Fixed so ids stay stable across restarts.
const DOCUMENT_NAMESPACE: Uuid = Uuid::from_u128(0x6d1f_3c2a_8b4e_4f07_9a55_0c3e_71d2_a914);

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    SessionId,
    "Typed wrapper for the conversation session tied to an analyzed document."
);
define_id!(AnalysisId, "Typed wrapper for a single analysis run.");

impl SessionId {
    /// Deterministic id for a document: the same bytes always map to the same session.
    pub fn for_document(bytes: &[u8]) -> Self {
        Self(Uuid::new_v5(&DOCUMENT_NAMESPACE, bytes))
    }
}

/// Orderable id of a chat message. Zero is reserved for the synthetic sentinel message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl MessageId {
    pub const SENTINEL: MessageId = MessageId(0);

    /// Next id after `last`, based on wall-clock millis but strictly increasing.
    pub fn next_after(last: Option<MessageId>) -> Self {
        let now = chrono::Utc::now().timestamp_millis().max(1) as u64;
        match last {
            Some(MessageId(prev)) if prev >= now => MessageId(prev + 1),
            _ => MessageId(now),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
