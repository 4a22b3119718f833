use std::sync::Arc;

use async_trait::async_trait;

use super::prompt::query_rewrite_prompt;
use super::{FragmentStream, PipelineStage, StageError, StageName};
use crate::infrastructure::llm::{LlmClient, LlmMessage};

/// Streams a rewritten form of the user's question (RAG mode only)
pub struct RewriteStage {
    llm: Arc<dyn LlmClient>,
}

impl RewriteStage {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl PipelineStage for RewriteStage {
    /// The user question to rewrite
    type Input = String;
    type Fragment = String;

    fn name(&self) -> StageName {
        StageName::Rewrite
    }

    async fn start(&self, query: String) -> Result<FragmentStream<String>, StageError> {
        let messages = vec![LlmMessage::user(query_rewrite_prompt(&query))];
        let tokens = self
            .llm
            .generate_stream(messages)
            .await
            .map_err(|e| StageError::upstream(self.name(), e.to_string()))?;
        Ok(FragmentStream::from_tokens(self.name(), tokens))
    }
}
