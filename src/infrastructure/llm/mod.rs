//! Language model fragment sources

pub mod openai;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::models::{Message, Role};

pub use openai::OpenAiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Stream error: {0}")]
    Stream(String),
}

/// Text fragments as the model produces them. The channel closes on
/// completion; an `Err` item is the last one sent.
pub type TokenStream = mpsc::Receiver<Result<String, LlmError>>;

/// Chat message in the shape sent upstream (attachments stripped)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmMessage {
    pub role: Role,
    pub content: String,
}

impl LlmMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

impl From<&Message> for LlmMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model_name(&self) -> &str;

    /// Start a streamed generation for `messages`
    async fn generate_stream(&self, messages: Vec<LlmMessage>) -> Result<TokenStream, LlmError>;
}
