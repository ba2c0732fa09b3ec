use std::sync::Arc;

use polisense_common::types::{AnalysisReport, ChatMessage, Document};

use crate::llm::{ContentBlock, Message, Role};

pub const PRIMING_USER_TEXT: &str =
    "Here is the article I want to discuss. Please answer my questions based on this text.";
pub const PRIMING_MODEL_TEXT: &str = "I have read the article and I am ready to answer your \
questions about its content, bias, and context.";

/// Everything a dialogue turn is grounded on: the document, the prior analysis,
/// and the turns restored when the session was seeded.
///
/// A pure function of its inputs; rebuilding it is how a session is re-seeded.
#[derive(Clone, Debug)]
pub struct GroundingContext {
    document: Arc<Document>,
    system: String,
    prior_turns: Vec<Message>,
}

impl GroundingContext {
    /// Sentinel messages in `transcript` are display-only and never become turns.
    pub fn build(
        document: Arc<Document>,
        persona: &str,
        analysis: Option<&AnalysisReport>,
        transcript: &[ChatMessage],
    ) -> Self {
        let prior_turns = transcript
            .iter()
            .filter(|m| !m.is_sentinel())
            .map(Message::from)
            .collect();

        Self {
            document,
            system: system_instruction(persona, analysis),
            prior_turns,
        }
    }

    /// Swap in a new analysis; the document and prior turns are untouched.
    pub fn reground(&mut self, persona: &str, analysis: Option<&AnalysisReport>) {
        self.system = system_instruction(persona, analysis);
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn prior_turns(&self) -> &[Message] {
        &self.prior_turns
    }

    /// Priming exchange followed by the restored prior turns.
    pub fn history(&self) -> Vec<Message> {
        let mut history = Vec::with_capacity(self.prior_turns.len() + 2);
        history.push(Message {
            role: Role::User,
            content: vec![
                ContentBlock::Document {
                    document: Arc::clone(&self.document),
                },
                ContentBlock::Text {
                    text: PRIMING_USER_TEXT.to_string(),
                },
            ],
        });
        history.push(Message::text(Role::Model, PRIMING_MODEL_TEXT));
        history.extend(self.prior_turns.iter().cloned());
        history
    }
}

fn system_instruction(persona: &str, analysis: Option<&AnalysisReport>) -> String {
    let persona = persona.trim();
    match analysis {
        Some(report) => format!(
            "{}\n\nA prior analysis classified this article as {} (score {:.1} on a -100 to 100 \
             scale, {:.1}% confidence). Summary of that analysis:\n{}",
            persona,
            report.label,
            report.score,
            report.confidence * 100.0,
            report.summary
        ),
        None => persona.to_string(),
    }
}
