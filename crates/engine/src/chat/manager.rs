use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use polisense_common::types::{AnalysisReport, Document};
use polisense_common::SessionId;

use super::session::ChatSession;
use super::store::TranscriptStore;
use crate::llm::LlmCaller;

/// Registry of open chat sessions, one per analyzed document.
///
/// Sessions stay registered until `close`, which the HTTP layer exposes as
/// `DELETE /sessions/{id}`.
pub struct SessionManager {
    llm: Arc<dyn LlmCaller>,
    store: Arc<dyn TranscriptStore>,
    persona: String,
    key_prefix: String,
    sessions: RwLock<HashMap<SessionId, Arc<ChatSession>>>,
}

impl SessionManager {
    pub fn new(
        llm: Arc<dyn LlmCaller>,
        store: Arc<dyn TranscriptStore>,
        persona: String,
        key_prefix: String,
    ) -> Self {
        Self {
            llm,
            store,
            persona,
            key_prefix,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open the session for `document`, restoring any persisted transcript.
    ///
    /// A session already registered for the same document is reused with its
    /// transcript intact; a new `analysis` replaces the one it was grounded on.
    pub async fn open(
        &self,
        document: Arc<Document>,
        analysis: Option<AnalysisReport>,
    ) -> Arc<ChatSession> {
        let id = document.session_id();
        if let Some(existing) = self.get(id) {
            if let Some(report) = analysis {
                existing.refresh_analysis(report);
            }
            return existing;
        }

        let session = Arc::new(ChatSession::new(
            document,
            analysis,
            self.persona.clone(),
            &self.key_prefix,
            Arc::clone(&self.llm),
            Arc::clone(&self.store),
        ));
        session.open().await;

        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Two opens for the same document may race; keep whichever registered first.
        Arc::clone(sessions.entry(id).or_insert(session))
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<ChatSession>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Drop a session from the registry. Its persisted transcript is kept.
    pub fn close(&self, id: SessionId) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
