mod assemble;
mod normalize;
mod pipeline;

pub use assemble::{assemble, evidence_sentences, SUMMARY_FALLBACK};
pub use normalize::{direction_for_score, normalize, DEFAULT_DIRECTION_THRESHOLD};
pub use pipeline::{AnalysisError, AnalysisPipeline};
