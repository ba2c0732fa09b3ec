//! Integration tests for the HTTP surface.
//! External services are mocked; the router is served on an ephemeral port.
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde_json::Value;

use polisense_common::config::AnalysisConfig;
use polisense_common::types::{ClassificationResult, Document, RawEvidence};
use polisense_engine::analysis::AnalysisPipeline;
use polisense_engine::chat::{MemoryTranscriptStore, SessionManager, WELCOME_MESSAGE};
use polisense_engine::classifier::{Classifier, ClassifierError};
use polisense_engine::explain::ExplanationClient;
use polisense_engine::llm::{LlmCaller, LlmError, LlmResponse, Message, StopReason, TokenUsage};
use polisense_engine::routes::{self, AppState};

const EXPLANATION: &str = r#"{
    "metadata": {"title": "Transit levy passes", "outlet": "Harbor Ledger", "publishedDate": "2024-09-12", "wordCount": 812, "readTime": "4 min read"},
    "summary": "Coverage leans on fiscal-responsibility framing."
}"#;

struct FixedClassifier {
    fail: bool,
    calls: AtomicU32,
}

impl Classifier for FixedClassifier {
    fn classify<'a>(
        &'a self,
        _document: &'a Document,
    ) -> Pin<Box<dyn Future<Output = Result<ClassificationResult, ClassifierError>> + Send + 'a>>
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail {
            Err(ClassifierError::Status {
                status: 500,
                body: "model not loaded".into(),
            })
        } else {
            Ok(ClassificationResult {
                predicted_class_id: 2,
                probabilities: vec![0.1, 0.2, 0.7],
                evidence: vec![RawEvidence {
                    text: "Taxpayers are once again asked to foot the bill".into(),
                    raw_confidence: 0.91,
                }],
            })
        };
        Box::pin(async move { result })
    }
}

struct FixedLlm {
    text: String,
}

impl LlmCaller for FixedLlm {
    fn generate<'a>(
        &'a self,
        _system: &'a str,
        _messages: &'a [Message],
        _response_schema: Option<&'a Value>,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>> {
        let text = self.text.clone();
        Box::pin(async move {
            Ok(LlmResponse {
                text,
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        })
    }
}

async fn serve(classifier_fails: bool) -> String {
    let pipeline = AnalysisPipeline::new(
        Arc::new(FixedClassifier {
            fail: classifier_fails,
            calls: AtomicU32::new(0),
        }),
        ExplanationClient::new(Arc::new(FixedLlm {
            text: EXPLANATION.into(),
        })),
        "You are PoliSense.".into(),
        AnalysisConfig::default(),
    );
    let sessions = SessionManager::new(
        Arc::new(FixedLlm {
            text: "The levy passed 6-3.".into(),
        }),
        Arc::new(MemoryTranscriptStore::new()),
        "Answer from the article.".into(),
        "polisense_chat_".into(),
    );
    let state = Arc::new(AppState {
        pipeline,
        sessions,
        redis: None,
        metrics_handle: None,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, routes::router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn analyze(base: &str, file_name: &str, body: &[u8]) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/analyze", base))
        .header("x-file-name", file_name)
        .body(body.to_vec())
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let base = serve(false).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["redis"], "disabled");
}

#[tokio::test]
async fn test_analyze_then_chat() {
    let base = serve(false).await;
    let client = reqwest::Client::new();

    let response = analyze(&base, "levy.txt", b"The transit levy passed.").await;
    assert_eq!(response.status(), 200);
    let report: Value = response.json().await.unwrap();

    assert_eq!(report["score"], 60.0);
    assert_eq!(report["label"], "Right");
    assert_eq!(report["direction"], "Right");
    assert_eq!(report["metadata"]["outlet"], "Harbor Ledger");
    assert_eq!(report["evidence"][0]["impact_score"], 9.1);
    let session_id = report["session_id"].as_str().unwrap().to_string();

    let session: Value = client
        .get(format!("{}/sessions/{}", base, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["phase"], "ready");
    assert_eq!(session["messages"][0]["text"], WELCOME_MESSAGE);

    let sent = client
        .post(format!("{}/sessions/{}/messages", base, session_id))
        .json(&serde_json::json!({ "text": "What was the vote?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(sent.status(), 200);
    let outcome: Value = sent.json().await.unwrap();
    assert_eq!(outcome["status"], "accepted");
    assert_eq!(outcome["reply"]["text"], "The levy passed 6-3.");
    assert_eq!(outcome["reply"]["role"], "model");

    let rejected = client
        .post(format!("{}/sessions/{}/messages", base, session_id))
        .json(&serde_json::json!({ "text": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 422);
    let outcome: Value = rejected.json().await.unwrap();
    assert_eq!(outcome["reason"], "empty");

    let cleared: Value = client
        .delete(format!("{}/sessions/{}/messages", base, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reanalysis_keeps_conversation() {
    let base = serve(false).await;
    let client = reqwest::Client::new();

    let report: Value = analyze(&base, "same.txt", b"identical bytes")
        .await
        .json()
        .await
        .unwrap();
    let session_id = report["session_id"].as_str().unwrap().to_string();
    client
        .post(format!("{}/sessions/{}/messages", base, session_id))
        .json(&serde_json::json!({ "text": "Who is quoted?" }))
        .send()
        .await
        .unwrap();

    let again: Value = analyze(&base, "same.txt", b"identical bytes")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(again["session_id"], report["session_id"]);

    let session: Value = client
        .get(format!("{}/sessions/{}", base, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["messages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_close_session_releases_it_and_keeps_transcript() {
    let base = serve(false).await;
    let client = reqwest::Client::new();

    let report: Value = analyze(&base, "closing.txt", b"closing bytes")
        .await
        .json()
        .await
        .unwrap();
    let session_url = format!("{}/sessions/{}", base, report["session_id"].as_str().unwrap());
    client
        .post(format!("{}/messages", session_url))
        .json(&serde_json::json!({ "text": "Who is quoted?" }))
        .send()
        .await
        .unwrap();

    let closed = client.delete(&session_url).send().await.unwrap();
    assert_eq!(closed.status(), 204);
    assert_eq!(client.get(&session_url).send().await.unwrap().status(), 404);
    assert_eq!(client.delete(&session_url).send().await.unwrap().status(), 404);

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["sessions"], 0);

    // analyzing the same bytes again reopens from the persisted transcript
    analyze(&base, "closing.txt", b"closing bytes").await;
    let session: Value = client
        .get(&session_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["messages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_classifier_failure_is_bad_gateway() {
    let base = serve(true).await;
    let response = analyze(&base, "story.pdf", b"%PDF-1.7").await;

    assert_eq!(response.status(), 502);
    let text = response.text().await.unwrap();
    assert!(text.contains("Classification service error"));
}

#[tokio::test]
async fn test_unsupported_document_is_415() {
    let base = serve(false).await;
    let response = analyze(&base, "slides.pptx", b"PK").await;
    assert_eq!(response.status(), 415);
}

#[tokio::test]
async fn test_docx_upload_is_415() {
    let base = serve(false).await;
    let response = analyze(&base, "essay.docx", b"PK\x03\x04").await;
    assert_eq!(response.status(), 415);
}

#[tokio::test]
async fn test_missing_file_name_is_400() {
    let base = serve(false).await;
    let response = reqwest::Client::new()
        .post(format!("{}/analyze", base))
        .body("plain text")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let base = serve(false).await;
    let response = reqwest::get(format!(
        "{}/sessions/{}",
        base,
        uuid::Uuid::new_v4()
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), 404);
}
