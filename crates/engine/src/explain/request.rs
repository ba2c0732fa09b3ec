use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::Value;

use polisense_common::types::{Document, NormalizedBiasScore, RawEvidence};

use super::schema::explanation_schema;
use crate::llm::{ContentBlock, Message, Role};

const EXPLAIN_INSTRUCTION: &str = "Extract metadata and explain the political leaning and bias \
of this article using the provided analysis results.";

/// A grounded, schema-constrained request for the explanation model.
///
/// The score and label are the classifier's, already computed; the model is asked
/// to explain them, never to re-derive them.
#[derive(Clone, Debug)]
pub struct ExplanationRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub schema: Value,
}

impl ExplanationRequest {
    /// `persona` is the configured system preamble; at most `top_k` evidence
    /// sentences are embedded, in ranked order.
    pub fn build(
        persona: &str,
        score: &NormalizedBiasScore,
        evidence: &[RawEvidence],
        top_k: usize,
        document: Arc<Document>,
    ) -> Self {
        let sentences: Vec<&str> = evidence
            .iter()
            .take(top_k)
            .map(|e| e.text.as_str())
            .collect();

        Self {
            system: grounding_instructions(persona, score, &sentences),
            messages: vec![Message {
                role: Role::User,
                content: vec![
                    ContentBlock::Document { document },
                    ContentBlock::Text {
                        text: EXPLAIN_INSTRUCTION.to_string(),
                    },
                ],
            }],
            schema: explanation_schema(),
        }
    }
}

fn grounding_instructions(persona: &str, score: &NormalizedBiasScore, sentences: &[&str]) -> String {
    let label = score.label.as_str();
    let mut out = String::new();

    let _ = writeln!(out, "{}", persona.trim());
    let _ = writeln!(out);
    let _ = writeln!(out, "**Input Data**:");
    let _ = writeln!(out, "- **Political Leaning**: {} (Score: {:.1})", label, score.score);
    let _ = writeln!(out, "- **Top Biased Sentences Detected**:");
    if sentences.is_empty() {
        let _ = writeln!(out, "  (none detected)");
    }
    for (i, sentence) in sentences.iter().enumerate() {
        let _ = writeln!(out, "  {}. \"{}\"", i + 1, sentence);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "1. **Metadata Extraction**:");
    let _ = writeln!(out, "   - Extract the **Article Title**.");
    let _ = writeln!(out, "   - Identify the **News Outlet** or Source.");
    let _ = writeln!(
        out,
        "   - Identify the **Published Date** (format YYYY-MM-DD, or \"Unknown\")."
    );
    let _ = writeln!(out, "   - Count the **Word Count** (approximate).");
    let _ = writeln!(out, "   - Estimate the **Read Time**.");
    let _ = writeln!(out);
    let _ = writeln!(out, "2. **Explanation & Summary**:");
    let _ = writeln!(
        out,
        "   - Provide a concise summary (max 150 words) of the article's content."
    );
    let _ = writeln!(
        out,
        "   - Explain *why* the article was classified as **{}**. Do not re-classify it.",
        label
    );
    let _ = writeln!(
        out,
        "   - Use the Top Biased Sentences above as evidence for the rhetorical framing."
    );
    let _ = write!(
        out,
        "   - Explain the bias in simple terms a general audience can follow."
    );

    out
}

#[cfg(test)]
mod tests {
    use polisense_common::types::Leaning;

    use super::*;

    fn score() -> NormalizedBiasScore {
        NormalizedBiasScore {
            score: -60.0,
            label: Leaning::Left,
            direction: Leaning::Left,
            confidence: 0.7,
            confidence_reasoning: "The model is 70.0% confident in this classification.".into(),
        }
    }

    fn evidence(n: usize) -> Vec<RawEvidence> {
        (1..=n)
            .map(|i| RawEvidence {
                text: format!("Sentence {}", i),
                raw_confidence: 0.9,
            })
            .collect()
    }

    fn document() -> Arc<Document> {
        Arc::new(Document::new("article.pdf", b"%PDF-1.4".to_vec()).unwrap())
    }

    #[test]
    fn test_embeds_precomputed_label_and_score() {
        let request = ExplanationRequest::build("You are PoliSense.", &score(), &evidence(2), 5, document());

        assert!(request.system.starts_with("You are PoliSense."));
        assert!(request.system.contains("**Political Leaning**: Left (Score: -60.0)"));
        assert!(request.system.contains("classified as **Left**"));
        assert!(request.system.contains("  1. \"Sentence 1\""));
        assert!(request.system.contains("  2. \"Sentence 2\""));
    }

    #[test]
    fn test_caps_evidence_at_top_k() {
        let request = ExplanationRequest::build("p", &score(), &evidence(8), 5, document());
        assert!(request.system.contains("5. \"Sentence 5\""));
        assert!(!request.system.contains("Sentence 6"));
    }

    #[test]
    fn test_no_evidence() {
        let request = ExplanationRequest::build("p", &score(), &[], 5, document());
        assert!(request.system.contains("(none detected)"));
    }

    #[test]
    fn test_document_attached_inline_before_instruction() {
        let request = ExplanationRequest::build("p", &score(), &evidence(1), 5, document());
        assert_eq!(request.messages.len(), 1);
        let message = &request.messages[0];
        assert_eq!(message.role, Role::User);
        match &message.content[..] {
            [ContentBlock::Document { document }, ContentBlock::Text { text }] => {
                assert_eq!(document.file_name, "article.pdf");
                assert_eq!(text, EXPLAIN_INSTRUCTION);
            }
            other => panic!("unexpected content: {:?}", other),
        }
        assert_eq!(request.schema, explanation_schema());
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = ExplanationRequest::build("p", &score(), &evidence(3), 5, document());
        let b = ExplanationRequest::build("p", &score(), &evidence(3), 5, document());
        assert_eq!(a.system, b.system);
    }
}
