//! Session status and service health

use axum::{extract::Query, Extension};
use serde::Serialize;

use super::chat::AppState;
use super::halt::ChatIdQuery;
use super::response::ApiResponse;
use crate::domain::models::SessionStatus;
use crate::infrastructure::storage::StoreBackend;
use crate::shared::{AppError, Result};

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub chat_id: String,
    pub status: SessionStatus,
}

/// GET /v1/chat/status?chat_id=..
pub async fn session_status_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<ChatIdQuery>,
) -> Result<ApiResponse<SessionStatusResponse>> {
    let chat_id = params.chat_id.as_str();
    if chat_id.trim().is_empty() {
        return Err(AppError::InvalidRequest("chat_id must not be empty".into()));
    }

    let status = state
        .orchestrator
        .store()
        .get(chat_id)
        .await?
        .ok_or_else(|| AppError::SessionNotFound(chat_id.to_string()))?;

    Ok(ApiResponse::success(SessionStatusResponse {
        chat_id: chat_id.to_string(),
        status,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: StoreBackend,
    pub model: String,
}

/// GET /v1/health
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> ApiResponse<HealthResponse> {
    ApiResponse::success(HealthResponse {
        status: if state.backend.is_degraded() { "degraded" } else { "ok" },
        store: state.backend.clone(),
        model: state.model_name.clone(),
    })
}
