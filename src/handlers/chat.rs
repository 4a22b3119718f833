//! Chat completion streaming endpoint
//!
//! The orchestrator runs on its own task and writes NDJSON records into a
//! channel; the response body drains that channel as the records arrive.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Json},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::domain::models::ChatRequest;
use crate::infrastructure::llm::LlmClient;
use crate::infrastructure::retrieval::Retriever;
use crate::infrastructure::storage::{StoreBackend, Stores, UserStore};
use crate::shared::{AppError, Result};
use crate::stream::{EventEmitter, HaltHandler, StreamOrchestrator};

/// Shared handler state, injected as an `Extension`
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<StreamOrchestrator>,
    pub halt: HaltHandler,
    pub users: Arc<dyn UserStore>,
    pub backend: StoreBackend,
    pub model_name: String,
    /// Events buffered between the orchestrator and a slow client
    pub stream_buffer: usize,
}

impl AppState {
    pub fn new(
        stores: Stores,
        llm: Arc<dyn LlmClient>,
        retriever: Arc<dyn Retriever>,
        stream_buffer: usize,
    ) -> Self {
        let Stores {
            sessions,
            users,
            backend,
        } = stores;
        let model_name = llm.model_name().to_string();
        Self {
            orchestrator: Arc::new(StreamOrchestrator::new(sessions.clone(), llm, retriever)),
            halt: HaltHandler::new(sessions),
            users,
            backend,
            model_name,
            stream_buffer,
        }
    }
}

/// POST /v1/chat/completions
pub async fn completions_handler(
    Extension(state): Extension<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    request.validate().map_err(AppError::InvalidRequest)?;

    let request_id = Uuid::new_v4().to_string();
    tracing::info!(
        request_id = %request_id,
        chat_id = %request.chat_id,
        message_id = %request.message_id,
        "Accepted chat completion request"
    );

    let (emitter, rx) = EventEmitter::channel(state.stream_buffer);
    let orchestrator = state.orchestrator.clone();
    let task_request_id = request_id.clone();
    tokio::spawn(async move {
        let outcome = orchestrator.run(request, emitter).await;
        let error = outcome.error.as_ref().map(ToString::to_string);
        tracing::debug!(
            request_id = %task_request_id,
            state = outcome.state.as_str(),
            events = outcome.events,
            error = error.as_deref(),
            "Chat completion task finished"
        );
    });

    let headers = [
        (header::CONTENT_TYPE, "application/x-ndjson".to_string()),
        (header::CACHE_CONTROL, "no-cache".to_string()),
        (HeaderName::from_static("x-request-id"), request_id),
    ];
    let body = Body::from_stream(ReceiverStream::new(rx));

    Ok((StatusCode::OK, headers, body).into_response())
}
