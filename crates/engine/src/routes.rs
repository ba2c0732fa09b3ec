use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use polisense_common::types::{AnalysisReport, ChatMessage, Document};
use polisense_common::{PoliSenseError, SessionId};

use crate::analysis::AnalysisPipeline;
use crate::chat::{
    ChatSession, RedisTranscriptStore, RejectReason, SendOutcome, SessionManager, SessionPhase,
};

/// Uploads larger than this are refused before reaching the classifier.
const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state accessible from axum handlers.
pub struct AppState {
    pub pipeline: AnalysisPipeline,
    pub sessions: SessionManager,
    /// Present when transcripts are kept in Redis; checked by /health.
    pub redis: Option<Arc<RedisTranscriptStore>>,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/analyze", post(analyze_handler))
        .route(
            "/sessions/{id}",
            get(session_handler).delete(close_handler),
        )
        .route(
            "/sessions/{id}/messages",
            post(send_handler).delete(clear_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub phase: SessionPhase,
    pub messages: Vec<ChatMessage>,
}

impl SessionView {
    fn of(session: &ChatSession) -> Self {
        Self {
            session_id: session.id(),
            phase: session.phase(),
            messages: session.transcript(),
        }
    }
}

/// POST /analyze: raw document body, file name in `x-file-name`.
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AnalysisReport>, (StatusCode, String)> {
    let file_name = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or((
            StatusCode::BAD_REQUEST,
            "missing x-file-name header".to_string(),
        ))?;

    let document = Document::new(file_name, body.to_vec()).map_err(|e| {
        let status = if matches!(e, PoliSenseError::UnsupportedDocument(_)) {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        } else {
            StatusCode::BAD_REQUEST
        };
        (status, e.to_string())
    })?;
    if document.bytes.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "empty document".to_string()));
    }
    let document = Arc::new(document);

    let report = state
        .pipeline
        .analyze(Arc::clone(&document))
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, PoliSenseError::from(e).to_string()))?;

    state.sessions.open(document, Some(report.clone())).await;

    Ok(Json(report))
}

/// GET /sessions/{id}: transcript and phase of an open session.
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let session = find_session(&state, id)?;
    Ok(Json(SessionView::of(&session)))
}

/// DELETE /sessions/{id}: release an open session. Its persisted transcript is kept,
/// so analyzing the same document again resumes the conversation.
pub async fn close_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.sessions.close(SessionId::from_uuid(id)) {
        tracing::info!(session_id = %id, "Chat session closed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// POST /sessions/{id}/messages: one dialogue turn.
pub async fn send_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SendRequest>,
) -> Result<(StatusCode, Json<SendOutcome>), (StatusCode, String)> {
    let session = find_session(&state, id)?;

    let outcome = session.send(&request.text).await;
    let status = match &outcome {
        SendOutcome::Accepted { .. } => StatusCode::OK,
        SendOutcome::Rejected {
            reason: RejectReason::Empty,
        } => StatusCode::UNPROCESSABLE_ENTITY,
        SendOutcome::Rejected { .. } => StatusCode::CONFLICT,
    };
    Ok((status, Json(outcome)))
}

/// DELETE /sessions/{id}/messages: erase history and start over.
pub async fn clear_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let session = find_session(&state, id)?;

    session
        .clear()
        .await
        .map_err(|reason| (StatusCode::CONFLICT, reason.as_str().to_string()))?;
    Ok(Json(SessionView::of(&session)))
}

fn find_session(state: &AppState, id: Uuid) -> Result<Arc<ChatSession>, (StatusCode, String)> {
    state
        .sessions
        .get(SessionId::from_uuid(id))
        .ok_or_else(|| not_found(id))
}

fn not_found(id: Uuid) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        PoliSenseError::NotFound(format!("session {}", id)).to_string(),
    )
}

/// Health check endpoint. Checks the transcript store when it is remote.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let redis_ok = match &state.redis {
        Some(redis) => Some(redis.health_check().await.is_ok()),
        None => None,
    };
    let healthy = redis_ok.unwrap_or(true);

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = serde_json::json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "sessions": state.sessions.len(),
        "services": {
            "redis": match redis_ok {
                Some(true) => "healthy",
                Some(false) => "unhealthy",
                None => "disabled",
            },
        }
    });

    (status, Json(body))
}

/// Prometheus metrics endpoint.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}
