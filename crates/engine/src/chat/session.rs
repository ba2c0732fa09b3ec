use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use polisense_common::types::{AnalysisReport, ChatMessage, ChatRole, Document};
use polisense_common::{MessageId, SessionId};

use super::grounding::GroundingContext;
use super::store::TranscriptStore;
use crate::llm::{LlmCaller, Message};

pub const WELCOME_MESSAGE: &str =
    "Hi! I've analyzed the article. Ask me anything about its content, sources, or bias.";
pub const CLEARED_MESSAGE: &str = "History cleared. Ask me anything about the article.";
pub const EMPTY_REPLY_FALLBACK: &str = "I'm sorry, I couldn't generate a response.";
pub const TURN_ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Uninitialized,
    Seeding,
    Ready,
    Sending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Text was empty or whitespace.
    Empty,
    /// A turn is already in flight.
    Pending,
    /// The session has not been opened yet.
    NotReady,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Pending => "pending",
            Self::NotReady => "not_ready",
        }
    }
}

/// Result of a `send`. Turn failures are still `Accepted`: the error became transcript content.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    Accepted {
        user: ChatMessage,
        reply: ChatMessage,
        failed: bool,
    },
    Rejected {
        reason: RejectReason,
    },
}

struct SessionState {
    phase: SessionPhase,
    transcript: Vec<ChatMessage>,
    analysis: Option<AnalysisReport>,
    grounding: Option<GroundingContext>,
    /// Index of the first transcript entry appended after the last seeding.
    live_from: usize,
}

/// Work that holds the session out of `Ready` across an await.
#[derive(Clone, Copy, Debug)]
enum Operation {
    Open,
    Send,
    Clear,
}

/// Puts the phase back if the future driving `operation` is dropped mid-flight,
/// e.g. a client disconnect or a caller-side timeout.
struct InFlight<'a> {
    session: &'a ChatSession,
    operation: Operation,
    done: bool,
}

impl<'a> InFlight<'a> {
    fn new(session: &'a ChatSession, operation: Operation) -> Self {
        Self {
            session,
            operation,
            done: false,
        }
    }

    fn finish(mut self) {
        self.done = true;
        self.session.state().phase = SessionPhase::Ready;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.session.abandon(self.operation);
        }
    }
}

/// One dialogue about one document.
///
/// State lives behind a std mutex that is never held across an await; the
/// phase doubles as the single-flight flag, so a concurrent `send` is rejected
/// rather than queued.
pub struct ChatSession {
    id: SessionId,
    key: String,
    document: Arc<Document>,
    persona: String,
    llm: Arc<dyn LlmCaller>,
    store: Arc<dyn TranscriptStore>,
    state: Mutex<SessionState>,
}

impl ChatSession {
    pub fn new(
        document: Arc<Document>,
        analysis: Option<AnalysisReport>,
        persona: String,
        key_prefix: &str,
        llm: Arc<dyn LlmCaller>,
        store: Arc<dyn TranscriptStore>,
    ) -> Self {
        let id = document.session_id();
        Self {
            id,
            key: format!("{}{}", key_prefix, id),
            document,
            persona,
            llm,
            store,
            state: Mutex::new(SessionState {
                phase: SessionPhase::Uninitialized,
                transcript: Vec::new(),
                analysis,
                grounding: None,
                live_from: 0,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Key of the persisted transcript in the store.
    pub fn store_key(&self) -> &str {
        &self.key
    }

    pub fn phase(&self) -> SessionPhase {
        self.state().phase
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.state().transcript.clone()
    }

    pub fn grounding(&self) -> Option<GroundingContext> {
        self.state().grounding.clone()
    }

    pub fn analysis(&self) -> Option<AnalysisReport> {
        self.state().analysis.clone()
    }

    /// Ground later turns on a newer analysis of the same document.
    ///
    /// The transcript is kept. A turn already in flight finishes on the old grounding.
    pub fn refresh_analysis(&self, report: AnalysisReport) {
        let mut state = self.state();
        if let Some(grounding) = state.grounding.as_mut() {
            grounding.reground(&self.persona, Some(&report));
        }
        state.analysis = Some(report);
        tracing::info!(session_id = %self.id, "Chat grounding refreshed with new analysis");
    }

    /// Load the persisted transcript and seed the grounding context.
    ///
    /// Only acts from `Uninitialized`; a missing or unreadable transcript
    /// starts the session fresh with the welcome message.
    pub async fn open(&self) {
        {
            let mut state = self.state();
            if state.phase != SessionPhase::Uninitialized {
                return;
            }
            state.phase = SessionPhase::Seeding;
        }
        let in_flight = InFlight::new(self, Operation::Open);

        let transcript = match self.load().await {
            Some(messages) if !messages.is_empty() => {
                tracing::info!(
                    session_id = %self.id,
                    messages = messages.len(),
                    "Restored chat transcript"
                );
                messages
            }
            _ => vec![ChatMessage::sentinel(WELCOME_MESSAGE)],
        };

        self.seed(transcript);
        in_flight.finish();
    }

    /// Submit one user turn. Never fails: service errors become a fallback reply.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let (user, history, system) = {
            let mut state = self.state();
            let reject = if text.trim().is_empty() {
                Some(RejectReason::Empty)
            } else {
                match state.phase {
                    SessionPhase::Ready => None,
                    SessionPhase::Sending => Some(RejectReason::Pending),
                    SessionPhase::Uninitialized | SessionPhase::Seeding => {
                        Some(RejectReason::NotReady)
                    }
                }
            };
            if let Some(reason) = reject {
                tracing::debug!(session_id = %self.id, ?reason, "Send rejected");
                metrics::counter!("chat.sends_rejected").increment(1);
                return SendOutcome::Rejected { reason };
            }

            let Some(grounding) = state.grounding.clone() else {
                return SendOutcome::Rejected {
                    reason: RejectReason::NotReady,
                };
            };

            let user = ChatMessage {
                id: next_id(&state.transcript),
                role: ChatRole::User,
                text: text.to_string(),
            };
            state.transcript.push(user.clone());
            state.phase = SessionPhase::Sending;

            let mut history = grounding.history();
            history.extend(
                state.transcript[state.live_from..]
                    .iter()
                    .filter(|m| !m.is_sentinel())
                    .map(Message::from),
            );
            (user, history, grounding.system().to_string())
        };
        let in_flight = InFlight::new(self, Operation::Send);

        metrics::counter!("chat.turns").increment(1);
        let (reply_text, failed) = match self.llm.generate(&system, &history, None).await {
            Ok(response) if response.text.trim().is_empty() => {
                tracing::warn!(
                    session_id = %self.id,
                    stop_reason = ?response.stop_reason,
                    "Empty dialogue reply"
                );
                (EMPTY_REPLY_FALLBACK.to_string(), false)
            }
            Ok(response) => (response.text, false),
            Err(e) => {
                let err = polisense_common::PoliSenseError::DialogueTurn(e.to_string());
                tracing::error!(
                    session_id = %self.id,
                    error = %err,
                    retryable = e.is_retryable(),
                    "Chat turn failed"
                );
                metrics::counter!("chat.turn_failures").increment(1);
                (TURN_ERROR_MESSAGE.to_string(), true)
            }
        };

        let (reply, snapshot) = {
            let mut state = self.state();
            let reply = push_reply(&mut state.transcript, reply_text);
            (reply, state.transcript.clone())
        };

        self.persist(&snapshot).await;
        in_flight.finish();

        SendOutcome::Accepted {
            user,
            reply,
            failed,
        }
    }

    /// Erase the persisted history and start over from the priming exchange.
    ///
    /// The cleared sentinel is then persisted, so a later reopen shows the
    /// cleared message rather than the welcome.
    pub async fn clear(&self) -> Result<(), RejectReason> {
        {
            let mut state = self.state();
            match state.phase {
                SessionPhase::Ready => state.phase = SessionPhase::Seeding,
                SessionPhase::Sending => return Err(RejectReason::Pending),
                SessionPhase::Uninitialized | SessionPhase::Seeding => {
                    return Err(RejectReason::NotReady)
                }
            }
        }
        let in_flight = InFlight::new(self, Operation::Clear);

        let transcript = vec![ChatMessage::sentinel(CLEARED_MESSAGE)];
        self.seed(transcript.clone());
        if let Err(e) = self.store.remove(&self.key).await {
            tracing::error!(session_id = %self.id, error = %e, "Failed to erase chat transcript");
        }
        self.persist(&transcript).await;
        in_flight.finish();

        tracing::info!(session_id = %self.id, "Chat history cleared");
        Ok(())
    }

    /// Rebuild the grounding from `transcript`. Leaves the phase alone.
    fn seed(&self, transcript: Vec<ChatMessage>) {
        let mut state = self.state();
        let grounding = GroundingContext::build(
            Arc::clone(&self.document),
            &self.persona,
            state.analysis.as_ref(),
            &transcript,
        );
        state.live_from = transcript.len();
        state.transcript = transcript;
        state.grounding = Some(grounding);
    }

    /// Recovery for an operation whose future was dropped before it finished.
    fn abandon(&self, operation: Operation) {
        let mut state = self.state();
        match operation {
            Operation::Open => state.phase = SessionPhase::Uninitialized,
            Operation::Clear => state.phase = SessionPhase::Ready,
            Operation::Send => {
                // The reply never arrived; close the orphaned user turn.
                if state
                    .transcript
                    .last()
                    .is_some_and(|m| m.role == ChatRole::User)
                {
                    push_reply(&mut state.transcript, TURN_ERROR_MESSAGE.to_string());
                    metrics::counter!("chat.turn_failures").increment(1);
                    self.persist_detached(state.transcript.clone());
                }
                state.phase = SessionPhase::Ready;
            }
        }
        tracing::warn!(session_id = %self.id, ?operation, "Chat operation abandoned");
    }

    async fn load(&self) -> Option<Vec<ChatMessage>> {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Failed to read chat transcript");
                return None;
            }
        };

        match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
            Ok(messages) => Some(messages),
            Err(e) => {
                let err = polisense_common::PoliSenseError::PersistenceRead(e.to_string());
                tracing::warn!(session_id = %self.id, error = %err, "Discarding chat transcript");
                None
            }
        }
    }

    async fn persist(&self, transcript: &[ChatMessage]) {
        let Some(raw) = self.serialize(transcript) else {
            return;
        };
        if let Err(e) = self.store.set(&self.key, raw).await {
            tracing::error!(session_id = %self.id, error = %e, "Failed to persist chat transcript");
        }
    }

    /// Persist from a context that cannot await. Skipped outside a runtime.
    fn persist_detached(&self, transcript: Vec<ChatMessage>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let Some(raw) = self.serialize(&transcript) else {
            return;
        };

        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let id = self.id;
        handle.spawn(async move {
            if let Err(e) = store.set(&key, raw).await {
                tracing::error!(session_id = %id, error = %e, "Failed to persist chat transcript");
            }
        });
    }

    fn serialize(&self, transcript: &[ChatMessage]) -> Option<String> {
        match serde_json::to_string(transcript) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::error!(session_id = %self.id, error = %e, "Failed to serialize chat transcript");
                None
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn push_reply(transcript: &mut Vec<ChatMessage>, text: String) -> ChatMessage {
    let reply = ChatMessage {
        id: next_id(transcript),
        role: ChatRole::Model,
        text,
    };
    transcript.push(reply.clone());
    reply
}

fn next_id(transcript: &[ChatMessage]) -> MessageId {
    MessageId::next_after(transcript.iter().map(|m| m.id).max())
}
