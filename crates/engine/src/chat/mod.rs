pub mod grounding;
mod manager;
pub mod redis_store;
mod session;
pub mod store;

pub use grounding::GroundingContext;
pub use manager::SessionManager;
pub use redis_store::RedisTranscriptStore;
pub use session::{
    ChatSession, RejectReason, SendOutcome, SessionPhase, CLEARED_MESSAGE, EMPTY_REPLY_FALLBACK,
    TURN_ERROR_MESSAGE, WELCOME_MESSAGE,
};
pub use store::{MemoryTranscriptStore, StoreError, TranscriptStore};
