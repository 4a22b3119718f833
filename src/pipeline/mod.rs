//! Pipeline stages
//!
//! Rewrite and Answer stream text fragments from the language model; Search
//! produces exactly one retrieval result. All three expose the same shape,
//! a [`FragmentStream`] that yields items until exhaustion or the first
//! error, so the orchestrator can drive them uniformly.

pub mod answer;
pub mod prompt;
pub mod rewrite;
pub mod search;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio_stream::wrappers::ReceiverStream;

use crate::infrastructure::llm::TokenStream;

pub use answer::{AnswerInput, AnswerStage};
pub use rewrite::RewriteStage;
pub use search::SearchStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageName {
    Rewrite,
    Search,
    Answer,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Rewrite => "rewrite",
            StageName::Search => "search",
            StageName::Answer => "answer",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("{stage} stage failed: {message}")]
    Upstream { stage: StageName, message: String },
}

impl StageError {
    pub fn upstream(stage: StageName, message: impl Into<String>) -> Self {
        Self::Upstream {
            stage,
            message: message.into(),
        }
    }

    /// Stage that raised the error
    pub fn stage(&self) -> StageName {
        match self {
            StageError::RetrievalUnavailable(_) => StageName::Search,
            StageError::Upstream { stage, .. } => *stage,
        }
    }
}

/// Finite, non-restartable sequence of stage output.
///
/// Ends at the first `None`; an `Err` item means the producer failed and
/// nothing further should be read.
pub struct FragmentStream<T> {
    inner: Pin<Box<dyn Stream<Item = Result<T, StageError>> + Send>>,
}

impl<T: Send + 'static> FragmentStream<T> {
    pub fn new(stream: impl Stream<Item = Result<T, StageError>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Single-shot output (Search)
    pub fn once(item: T) -> Self {
        Self::new(futures::stream::once(async move { Ok(item) }))
    }

    pub async fn next(&mut self) -> Option<Result<T, StageError>> {
        self.inner.next().await
    }
}

impl FragmentStream<String> {
    /// Adapt a model token stream, tagging its failures with `stage`
    pub fn from_tokens(stage: StageName, tokens: TokenStream) -> Self {
        Self::new(
            ReceiverStream::new(tokens)
                .map(move |item| item.map_err(|e| StageError::upstream(stage, e.to_string()))),
        )
    }
}

/// Common capability of the three stages: produce zero-or-more fragments,
/// or fail with a stage-specific error.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    type Input: Send + 'static;
    type Fragment: Send + 'static;

    fn name(&self) -> StageName;

    async fn start(&self, input: Self::Input) -> Result<FragmentStream<Self::Fragment>, StageError>;
}
