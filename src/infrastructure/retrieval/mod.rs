//! Document retrieval sources

pub mod fixture;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::Attachment;

pub use fixture::StaticRetriever;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Failed to read retrieval payload {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed retrieval payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Run one search; the result is complete or the call fails
    async fn search(&self, query: &str) -> Result<Attachment, RetrievalError>;
}
