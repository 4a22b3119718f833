use axum::extract::{rejection::JsonRejection, Json};
use serde::{Deserialize, Serialize};

use super::response::ApiResponse;
use crate::domain::models::Message;
use crate::pipeline::prompt::chat_title;
use crate::shared::{AppError, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct TitleResponse {
    pub title: String,
}

/// POST /v1/chat/summarize
/// Title a conversation from its most recent message
pub async fn summarize_handler(
    payload: std::result::Result<Json<Vec<Message>>, JsonRejection>,
) -> Result<ApiResponse<TitleResponse>> {
    let Json(messages) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let last = messages
        .last()
        .ok_or_else(|| AppError::InvalidRequest("messages must not be empty".into()))?;

    Ok(ApiResponse::success(TitleResponse {
        title: chat_title(&last.content),
    }))
}
