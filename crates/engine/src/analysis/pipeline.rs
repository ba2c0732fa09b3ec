use std::sync::Arc;

use tracing::Instrument;

use polisense_common::config::AnalysisConfig;
use polisense_common::types::{AnalysisReport, Document};

use super::assemble::assemble;
use super::normalize::normalize;
use crate::classifier::{Classifier, ClassifierError};
use crate::explain::{ExplanationClient, ExplanationError, ExplanationRequest};

/// Classification → normalization → grounded explanation → report.
///
/// Holds no per-run state, so concurrent runs for different documents are independent.
pub struct AnalysisPipeline {
    classifier: Arc<dyn Classifier>,
    explainer: ExplanationClient,
    persona: String,
    config: AnalysisConfig,
}

/// A failed analysis run. No partial report exists; the caller retries from the start.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Classification(#[from] ClassifierError),

    #[error(transparent)]
    Explanation(#[from] ExplanationError),
}

impl AnalysisError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Classification(_) => "classification",
            Self::Explanation(_) => "explanation",
        }
    }
}

impl From<AnalysisError> for polisense_common::PoliSenseError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Classification(e) => e.into(),
            AnalysisError::Explanation(e) => e.into(),
        }
    }
}

impl AnalysisPipeline {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        explainer: ExplanationClient,
        persona: String,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            classifier,
            explainer,
            persona,
            config,
        }
    }

    /// Run the whole pipeline for one document.
    pub async fn analyze(&self, document: Arc<Document>) -> Result<AnalysisReport, AnalysisError> {
        let session_id = document.session_id();
        let span = tracing::info_span!("analysis", session_id = %session_id, file = %document.file_name);

        metrics::counter!("analysis.runs").increment(1);

        let result = self.run(document).instrument(span.clone()).await;
        let _enter = span.enter();
        match &result {
            Ok(report) => tracing::info!(
                score = report.score,
                label = %report.label,
                direction = %report.direction,
                "Analysis complete"
            ),
            Err(e) => {
                tracing::error!(stage = e.stage(), error = %e, "Analysis failed");
                metrics::counter!("analysis.failures", "stage" => e.stage()).increment(1);
            }
        }
        result
    }

    async fn run(&self, document: Arc<Document>) -> Result<AnalysisReport, AnalysisError> {
        let classification = self.classifier.classify(&document).await?;

        let score = normalize(&classification, self.config.direction_threshold);
        tracing::debug!(score = score.score, confidence = score.confidence, "Score normalized");

        let request = ExplanationRequest::build(
            &self.persona,
            &score,
            &classification.evidence,
            self.config.evidence_top_k,
            Arc::clone(&document),
        );
        let explanation = self.explainer.explain(&request).await?;

        Ok(assemble(
            document.session_id(),
            score,
            &classification.evidence,
            explanation,
        ))
    }
}
