use chrono::Utc;

use polisense_common::ids::{AnalysisId, SessionId};
use polisense_common::types::{AnalysisReport, EvidenceSentence, NormalizedBiasScore, RawEvidence};

use crate::explain::Explanation;

/// Shown when the explanation came back well-formed but with a blank summary.
pub const SUMMARY_FALLBACK: &str = "No summary available.";

/// Scale classifier confidence (0-1) to a 0-10 impact score.
pub fn evidence_sentences(evidence: &[RawEvidence]) -> Vec<EvidenceSentence> {
    evidence
        .iter()
        .map(|e| EvidenceSentence {
            text: e.text.clone(),
            impact_score: e.raw_confidence * 10.0,
            reasoning: format!("Model confidence: {:.1}%", e.raw_confidence * 100.0),
        })
        .collect()
}

/// Merge the normalized score, classifier evidence and explanation into one report.
pub fn assemble(
    session_id: SessionId,
    score: NormalizedBiasScore,
    evidence: &[RawEvidence],
    explanation: Explanation,
) -> AnalysisReport {
    let summary = if explanation.summary.trim().is_empty() {
        SUMMARY_FALLBACK.to_string()
    } else {
        explanation.summary
    };

    AnalysisReport {
        id: AnalysisId::new(),
        session_id,
        metadata: explanation.metadata,
        leaning_percentage: score.score.abs(),
        score: score.score,
        label: score.label,
        direction: score.direction,
        confidence: score.confidence,
        confidence_reasoning: score.confidence_reasoning,
        summary,
        evidence: evidence_sentences(evidence),
        analyzed_at: Utc::now(),
    }
}
