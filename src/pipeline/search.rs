use std::sync::Arc;

use async_trait::async_trait;

use super::{FragmentStream, PipelineStage, StageError, StageName};
use crate::domain::models::Attachment;
use crate::infrastructure::retrieval::Retriever;

/// Single-shot document retrieval
pub struct SearchStage {
    retriever: Arc<dyn Retriever>,
}

impl SearchStage {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl PipelineStage for SearchStage {
    type Input = String;
    type Fragment = Attachment;

    fn name(&self) -> StageName {
        StageName::Search
    }

    async fn start(&self, query: String) -> Result<FragmentStream<Attachment>, StageError> {
        let attachment = self
            .retriever
            .search(&query)
            .await
            .map_err(|e| StageError::RetrievalUnavailable(e.to_string()))?;

        let orphans = attachment.orphan_chunks().count();
        if orphans > 0 {
            tracing::debug!(
                orphan_chunks = orphans,
                "Retrieval result has chunks without a matching document"
            );
        }

        Ok(FragmentStream::once(attachment))
    }
}
