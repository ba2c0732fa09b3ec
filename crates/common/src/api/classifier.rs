use serde::{Deserialize, Serialize};

use crate::types::{ClassificationResult, RawEvidence};

/// POST /upload response from the classification service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifierResponse {
    pub leaning: LeaningEvaluation,
    pub bias: BiasEvaluation,
}

/// Whole-document leaning. Probabilities are indexed [Left, Center, Right].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaningEvaluation {
    pub predicted_class_id: i64,
    #[serde(default)]
    pub probabilities: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BiasEvaluation {
    #[serde(default)]
    pub top_biased_sentences: Vec<BiasItem>,
}

/// A single sentence scored by the bias model (class 1 = biased).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BiasItem {
    pub sentence: String,
    pub predicted_class_id: i64,
    pub confidence_score: f64,
}

impl From<ClassifierResponse> for ClassificationResult {
    fn from(resp: ClassifierResponse) -> Self {
        Self {
            predicted_class_id: resp.leaning.predicted_class_id,
            probabilities: resp.leaning.probabilities,
            evidence: resp
                .bias
                .top_biased_sentences
                .into_iter()
                .map(|item| RawEvidence {
                    text: item.sentence,
                    raw_confidence: item.confidence_score,
                })
                .collect(),
        }
    }
}
