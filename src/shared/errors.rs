use axum::http::StatusCode;
use thiserror::Error;

use crate::infrastructure::storage::StoreError;
use crate::pipeline::StageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Upstream stage failure: {0}")]
    UpstreamStageFailure(String),

    #[error("Session store degraded to in-process fallback: {0}")]
    BackendDegraded(String),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StageError> for AppError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::RetrievalUnavailable(msg) => AppError::RetrievalUnavailable(msg),
            upstream @ StageError::Upstream { .. } => {
                AppError::UpstreamStageFailure(upstream.to_string())
            }
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RetrievalUnavailable(_) | AppError::BackendDegraded(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::UpstreamStageFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
