use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classification::Leaning;
use crate::ids::{AnalysisId, SessionId};

/// Human-facing bias score derived deterministically from a classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBiasScore {
    /// -100 (Left) to 100 (Right).
    pub score: f64,
    /// Driven by the predicted class id.
    pub label: Leaning,
    /// Driven by the score threshold. Can disagree with `label`.
    pub direction: Leaning,
    /// Max class probability, 0.0 to 1.0.
    pub confidence: f64,
    pub confidence_reasoning: String,
}

/// Public form of a classifier evidence sentence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSentence {
    pub text: String,
    /// 0 to 10.
    pub impact_score: f64,
    pub reasoning: String,
}

/// Metadata extracted by the generative service. Field names follow its JSON schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    pub title: String,
    pub outlet: String,
    /// YYYY-MM-DD or "Unknown".
    pub published_date: String,
    pub word_count: u64,
    pub read_time: String,
}

/// The unified result of one analysis run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: AnalysisId,
    /// Conversation tied to the analyzed document.
    pub session_id: SessionId,
    pub metadata: ArticleMetadata,
    pub score: f64,
    pub label: Leaning,
    pub direction: Leaning,
    /// Absolute magnitude of the score (0-100).
    pub leaning_percentage: f64,
    pub confidence: f64,
    pub confidence_reasoning: String,
    pub summary: String,
    pub evidence: Vec<EvidenceSentence>,
    pub analyzed_at: DateTime<Utc>,
}
