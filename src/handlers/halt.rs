//! Halt endpoint: stops a running chat stream at its next fragment

use axum::{extract::Query, Extension};
use serde::{Deserialize, Serialize};

use super::chat::AppState;
use super::response::ApiResponse;
use crate::shared::Result;

#[derive(Debug, Deserialize)]
pub struct ChatIdQuery {
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HaltResponse {
    pub chat_id: String,
    pub status: String,
}

/// POST /v1/chat/halt?chat_id=..
pub async fn halt_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<ChatIdQuery>,
) -> Result<ApiResponse<HaltResponse>> {
    let receipt = state.halt.halt(&params.chat_id).await?;

    Ok(ApiResponse::success(HaltResponse {
        chat_id: receipt.chat_id,
        status: "halted".to_string(),
    }))
}
