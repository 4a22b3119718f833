use std::sync::Arc;

use async_trait::async_trait;

use super::prompt::{inject_context, rag_answer_prompt};
use super::{FragmentStream, PipelineStage, StageError, StageName};
use crate::domain::models::{Attachment, Message};
use crate::infrastructure::llm::{LlmClient, LlmMessage};

pub enum AnswerInput {
    /// Answer the conversation as given
    Plain { messages: Vec<Message> },
    /// Answer from retrieved context (RAG mode)
    Grounded {
        original_query: String,
        rewritten_query: String,
        context: Attachment,
    },
}

impl AnswerInput {
    fn into_llm_messages(self) -> Vec<LlmMessage> {
        match self {
            AnswerInput::Plain { messages } => messages.iter().map(LlmMessage::from).collect(),
            AnswerInput::Grounded {
                original_query,
                rewritten_query,
                context,
            } => {
                let block = inject_context(&original_query, &rewritten_query, &context.chunks);
                vec![LlmMessage::user(rag_answer_prompt(&block))]
            }
        }
    }
}

/// Streams the final answer text
pub struct AnswerStage {
    llm: Arc<dyn LlmClient>,
}

impl AnswerStage {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl PipelineStage for AnswerStage {
    type Input = AnswerInput;
    type Fragment = String;

    fn name(&self) -> StageName {
        StageName::Answer
    }

    async fn start(&self, input: AnswerInput) -> Result<FragmentStream<String>, StageError> {
        let tokens = self
            .llm
            .generate_stream(input.into_llm_messages())
            .await
            .map_err(|e| StageError::upstream(self.name(), e.to_string()))?;
        Ok(FragmentStream::from_tokens(self.name(), tokens))
    }
}
