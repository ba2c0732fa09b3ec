use thiserror::Error;

/// Top-level error type for PoliSense operations.
#[derive(Debug, Error)]
pub enum PoliSenseError {
    // --- Pipeline errors (analysis run halts, caller retries from start) ---
    #[error("Classification service error: {0}")]
    ClassificationService(String),

    #[error("Explanation synthesis error: {0}")]
    ExplanationSynthesis(String),

    // --- Session errors (recovered inside the session manager) ---
    #[error("Dialogue turn error: {0}")]
    DialogueTurn(String),

    #[error("Persisted transcript unreadable: {0}")]
    PersistenceRead(String),

    // --- Operational errors ---
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl PoliSenseError {
    /// Whether this error ends an analysis run with no report.
    pub fn is_pipeline_fatal(&self) -> bool {
        matches!(
            self,
            Self::ClassificationService(_) | Self::ExplanationSynthesis(_)
        )
    }
}

/// Result type alias for PoliSense operations.
pub type Result<T> = std::result::Result<T, PoliSenseError>;
