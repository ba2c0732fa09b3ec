use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;

use polisense_engine::analysis::AnalysisPipeline;
use polisense_engine::chat::{
    MemoryTranscriptStore, RedisTranscriptStore, SessionManager, TranscriptStore,
};
use polisense_engine::classifier::ClassifierClient;
use polisense_engine::config::{self, DIALOGUE_PROMPT, EXPLANATION_PROMPT};
use polisense_engine::explain::ExplanationClient;
use polisense_engine::llm::LlmClient;
use polisense_engine::routes::{self, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("PoliSense Engine starting");

    // Load configuration; fail loudly on misconfiguration.
    let config_dir = std::env::var("POLISENSE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    let engine_config = match config::load_config(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration, refusing to start");
            std::process::exit(1);
        }
    };
    let system = &engine_config.system;

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    let classifier = match ClassifierClient::new(&system.classifier) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build classifier client");
            std::process::exit(1);
        }
    };

    let Some(explanation_llm) = LlmClient::new(system.llm.explanation.clone()) else {
        tracing::error!(
            provider = %system.llm.explanation.provider,
            "No API key for the explanation model"
        );
        std::process::exit(1);
    };
    let Some(dialogue_llm) = LlmClient::new(system.llm.dialogue.clone()) else {
        tracing::error!(
            provider = %system.llm.dialogue.provider,
            "No API key for the dialogue model"
        );
        std::process::exit(1);
    };
    tracing::info!(
        explanation = explanation_llm.provider(),
        dialogue = dialogue_llm.provider(),
        "Generative clients ready"
    );

    // Transcript store.
    let (store, redis): (Arc<dyn TranscriptStore>, Option<Arc<RedisTranscriptStore>>) =
        match system.chat.store.as_str() {
            "redis" => {
                let redis_url =
                    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
                match RedisTranscriptStore::connect(&redis_url).await {
                    Ok(client) => {
                        let client = Arc::new(client);
                        (Arc::clone(&client) as Arc<dyn TranscriptStore>, Some(client))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to connect to Redis");
                        std::process::exit(1);
                    }
                }
            }
            _ => {
                tracing::warn!("Using in-memory transcript store; chat history is lost on restart");
                (
                    Arc::new(MemoryTranscriptStore::new()) as Arc<dyn TranscriptStore>,
                    None,
                )
            }
        };

    // Both prompts are guaranteed present by validation.
    let explanation_persona = engine_config
        .prompt(EXPLANATION_PROMPT)
        .unwrap_or_default()
        .to_string();
    let dialogue_persona = engine_config
        .prompt(DIALOGUE_PROMPT)
        .unwrap_or_default()
        .to_string();

    let pipeline = AnalysisPipeline::new(
        classifier,
        ExplanationClient::new(Arc::new(explanation_llm)),
        explanation_persona,
        system.analysis.clone(),
    );
    let sessions = SessionManager::new(
        Arc::new(dialogue_llm),
        store,
        dialogue_persona,
        system.chat.key_prefix.clone(),
    );

    let state = Arc::new(AppState {
        pipeline,
        sessions,
        redis,
        metrics_handle: Some(metrics_handle),
    });

    let app = routes::router(state);

    let port: u16 = std::env::var("ENGINE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind TCP listener");

    tracing::info!(port = port, "PoliSense Engine listening");

    axum::serve(listener, app).await.expect("HTTP server error");
}
