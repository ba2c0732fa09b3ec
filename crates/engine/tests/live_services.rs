//! Integration tests against live services.
//! All tests are `#[ignore]`; run with `cargo test -- --ignored`.
//!
//! Requirements: GEMINI_API_KEY (or ANTHROPIC_API_KEY per config/system.toml),
//! a running classification service, and REDIS_URL for the Redis store test.
use std::path::PathBuf;
use std::sync::Arc;

use polisense_common::types::Document;
use polisense_engine::analysis::AnalysisPipeline;
use polisense_engine::chat::{
    ChatSession, RedisTranscriptStore, SendOutcome, TranscriptStore, CLEARED_MESSAGE,
    WELCOME_MESSAGE,
};
use polisense_engine::classifier::ClassifierClient;
use polisense_engine::config::{self, EngineConfig, DIALOGUE_PROMPT, EXPLANATION_PROMPT};
use polisense_engine::explain::ExplanationClient;
use polisense_engine::llm::LlmClient;

const ARTICLE: &str = "City Council Approves Transit Levy\n\
    Metro Times, 2024-09-12\n\
    The council voted 6-3 on Tuesday to approve a half-cent sales tax for light rail. \
    Supporters called it a long-overdue investment in working families, while opponents \
    warned that taxpayers are once again being asked to foot the bill for a project \
    with no clear ridership plan.";

fn load() -> EngineConfig {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config");
    config::load_config(&dir).expect("Failed to load config")
}

fn document() -> Arc<Document> {
    Arc::new(Document::new("levy.txt", ARTICLE.as_bytes().to_vec()).unwrap())
}

#[tokio::test]
#[ignore]
async fn test_live_analysis() {
    let config = load();
    let classifier = ClassifierClient::new(&config.system.classifier).unwrap();
    let llm = LlmClient::new(config.system.llm.explanation.clone()).expect("API key not set");

    let pipeline = AnalysisPipeline::new(
        Arc::new(classifier),
        ExplanationClient::new(Arc::new(llm)),
        config.prompt(EXPLANATION_PROMPT).unwrap().to_string(),
        config.system.analysis.clone(),
    );

    let report = pipeline.analyze(document()).await.expect("Analysis failed");

    assert!((-100.0..=100.0).contains(&report.score));
    assert!((0.0..=1.0).contains(&report.confidence));
    assert!(!report.summary.is_empty());
    assert!(!report.metadata.title.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_live_dialogue_with_redis_store() {
    let config = load();
    let llm = LlmClient::new(config.system.llm.dialogue.clone()).expect("API key not set");
    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
    let store = Arc::new(
        RedisTranscriptStore::connect(&redis_url)
            .await
            .expect("Failed to connect to Redis"),
    );

    let session = ChatSession::new(
        document(),
        None,
        config.prompt(DIALOGUE_PROMPT).unwrap().to_string(),
        "polisense_test_chat_",
        Arc::new(llm),
        Arc::clone(&store) as Arc<dyn TranscriptStore>,
    );
    store.remove(session.store_key()).await.unwrap();

    session.open().await;
    assert_eq!(session.transcript()[0].text, WELCOME_MESSAGE);

    let outcome = session.send("How many council members voted against?").await;
    let SendOutcome::Accepted { reply, failed, .. } = outcome else {
        panic!("send rejected");
    };
    assert!(!failed, "dialogue turn failed: {}", reply.text);
    assert!(store.get(session.store_key()).await.unwrap().is_some());

    session.clear().await.unwrap();
    let stored = store.get(session.store_key()).await.unwrap().unwrap();
    assert!(stored.contains(CLEARED_MESSAGE));
}
