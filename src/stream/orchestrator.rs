//! Stream orchestrator
//!
//! Drives one completion request through
//! `Init -> (Rewriting -> Searching)? -> Answering -> Done | Aborted`.
//! The session status is polled before every fragment is written, which is
//! the only channel through which a halt reaches a running stream.

use std::sync::Arc;

use crate::domain::models::{ChatEvent, ChatRequest, EndReason, SessionStatus};
use crate::infrastructure::llm::LlmClient;
use crate::infrastructure::retrieval::Retriever;
use crate::infrastructure::storage::{SessionStore, StoreError};
use crate::pipeline::prompt::search_query;
use crate::pipeline::{
    AnswerInput, AnswerStage, PipelineStage, RewriteStage, SearchStage, StageError, StageName,
};
use crate::shared::AppError;
use crate::shared::logging::{
    log_stage_error, log_stream_end, log_stream_halted, log_stream_start, LogOperation,
};

use super::emitter::{EmitError, EventEmitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Init,
    Rewriting,
    Searching,
    Answering,
    Done,
    Aborted,
}

impl StreamState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Init => "init",
            StreamState::Rewriting => "rewriting",
            StreamState::Searching => "searching",
            StreamState::Answering => "answering",
            StreamState::Done => "done",
            StreamState::Aborted => "aborted",
        }
    }
}

/// Result of one run, for logging and tests
#[derive(Debug)]
pub struct StreamOutcome {
    pub state: StreamState,
    /// `None` when the client went away before End could be written
    pub end_reason: Option<EndReason>,
    pub events: usize,
    /// Stage or store failure that aborted the run; halts and disconnects leave it empty
    pub error: Option<AppError>,
}

/// Why a run left the happy path
#[derive(Debug)]
enum Abort {
    Halted,
    Stage(StageError),
    Store(StoreError),
    Transport(EmitError),
}

impl From<EmitError> for Abort {
    fn from(err: EmitError) -> Self {
        Abort::Transport(err)
    }
}

pub struct StreamOrchestrator {
    store: Arc<dyn SessionStore>,
    rewrite: RewriteStage,
    search: SearchStage,
    answer: AnswerStage,
}

impl StreamOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        llm: Arc<dyn LlmClient>,
        retriever: Arc<dyn Retriever>,
    ) -> Self {
        Self {
            store,
            rewrite: RewriteStage::new(llm.clone()),
            search: SearchStage::new(retriever),
            answer: AnswerStage::new(llm),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Run the request to a terminal state, writing every event to `emitter`.
    ///
    /// Never fails: stage and store errors become `End(-1)`; a closed
    /// transport ends the run without End.
    pub async fn run(&self, request: ChatRequest, mut emitter: EventEmitter) -> StreamOutcome {
        let chat_id = request.chat_id.clone();
        log_stream_start(&chat_id, &request.message_id, request.rag_enable);

        // Re-arm first so a halt issued before this request does not stick
        let armed = self.store.set(&chat_id, SessionStatus::Active).await;

        let init = ChatEvent::init(chat_id.as_str(), request.message_id.as_str());
        if let Err(e) = emitter.emit(init).await {
            return self.finish(&chat_id, Abort::Transport(e), &mut emitter).await;
        }

        let result = match armed {
            Ok(()) => self.run_pipeline(request, &mut emitter).await,
            Err(e) => Err(Abort::Store(e)),
        };

        match result {
            Ok(()) => self.complete(&chat_id, &mut emitter).await,
            Err(abort) => self.finish(&chat_id, abort, &mut emitter).await,
        }
    }

    async fn run_pipeline(
        &self,
        request: ChatRequest,
        emitter: &mut EventEmitter,
    ) -> Result<(), Abort> {
        let chat_id = request.chat_id.as_str();

        let input = if request.rag_enable {
            let original = request.latest_user_query().to_string();

            transition(chat_id, StreamState::Init, StreamState::Rewriting);
            let mut rewritten = String::new();
            self.drive(&self.rewrite, original.clone(), chat_id, emitter, |fragment| {
                rewritten.push_str(&fragment);
                ChatEvent::query_rewrite(fragment)
            })
            .await?;

            transition(chat_id, StreamState::Rewriting, StreamState::Searching);
            self.ensure_active(chat_id, StageName::Search).await?;
            let query = search_query(&rewritten, &original).to_string();

            let mut context = None;
            self.drive(&self.search, query.clone(), chat_id, emitter, |attachment| {
                context = Some(attachment.clone());
                ChatEvent::search(attachment)
            })
            .await?;

            transition(chat_id, StreamState::Searching, StreamState::Answering);
            AnswerInput::Grounded {
                original_query: original,
                rewritten_query: query,
                context: context.unwrap_or_default(),
            }
        } else {
            transition(chat_id, StreamState::Init, StreamState::Answering);
            AnswerInput::Plain {
                messages: request.query,
            }
        };

        self.drive(&self.answer, input, chat_id, emitter, ChatEvent::answer)
            .await
    }

    /// Pull fragments from `stage` until exhaustion, gating each one on the
    /// session still being active.
    async fn drive<S: PipelineStage>(
        &self,
        stage: &S,
        input: S::Input,
        chat_id: &str,
        emitter: &mut EventEmitter,
        mut to_event: impl FnMut(S::Fragment) -> ChatEvent,
    ) -> Result<(), Abort> {
        let mut fragments = stage.start(input).await.map_err(Abort::Stage)?;

        while let Some(item) = fragments.next().await {
            let fragment = item.map_err(Abort::Stage)?;
            self.ensure_active(chat_id, stage.name()).await?;
            emitter.emit(to_event(fragment)).await?;
        }
        Ok(())
    }

    async fn ensure_active(&self, chat_id: &str, stage: StageName) -> Result<(), Abort> {
        if self.store.is_active(chat_id).await.map_err(Abort::Store)? {
            return Ok(());
        }
        log_stream_halted(chat_id, stage);
        Err(Abort::Halted)
    }

    async fn complete(&self, chat_id: &str, emitter: &mut EventEmitter) -> StreamOutcome {
        // A halt racing the last fragment wins over completion
        match self
            .store
            .compare_and_set(chat_id, SessionStatus::Active, SessionStatus::Completed)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!(
                operation = LogOperation::Stream.as_str(),
                chat_id = chat_id,
                "Session left active before completion was recorded"
            ),
            Err(e) => tracing::warn!(
                operation = LogOperation::SessionStore.as_str(),
                chat_id = chat_id,
                error = %e,
                "Failed to record session completion"
            ),
        }

        transition(chat_id, StreamState::Answering, StreamState::Done);
        let end_reason = match emitter.emit(ChatEvent::end(EndReason::Completed)).await {
            Ok(()) => Some(EndReason::Completed),
            Err(_) => None,
        };
        log_stream_end(chat_id, end_reason, emitter.emitted());

        StreamOutcome {
            state: StreamState::Done,
            end_reason,
            events: emitter.emitted(),
            error: None,
        }
    }

    async fn finish(&self, chat_id: &str, abort: Abort, emitter: &mut EventEmitter) -> StreamOutcome {
        let error = match abort {
            Abort::Transport(e) => {
                tracing::debug!(
                    operation = LogOperation::Stream.as_str(),
                    chat_id = chat_id,
                    error = %e,
                    "Response stream closed"
                );
                return self.finished_aborted(chat_id, None, None, emitter);
            }
            Abort::Halted => None,
            Abort::Stage(e) => {
                let stage = e.stage();
                let error = AppError::from(e);
                log_stage_error(chat_id, stage, &error.to_string());
                Some(error)
            }
            Abort::Store(e) => {
                let error = AppError::from(e);
                tracing::error!(
                    operation = LogOperation::SessionStore.as_str(),
                    chat_id = chat_id,
                    error = %error,
                    "Session store failed during stream"
                );
                Some(error)
            }
        };

        let end_reason = match emitter.emit(ChatEvent::end(EndReason::Aborted)).await {
            Ok(()) => Some(EndReason::Aborted),
            Err(_) => None,
        };
        self.finished_aborted(chat_id, end_reason, error, emitter)
    }

    fn finished_aborted(
        &self,
        chat_id: &str,
        end_reason: Option<EndReason>,
        error: Option<AppError>,
        emitter: &EventEmitter,
    ) -> StreamOutcome {
        tracing::debug!(
            operation = LogOperation::Stream.as_str(),
            chat_id = chat_id,
            to = StreamState::Aborted.as_str(),
            "Stream state transition"
        );
        log_stream_end(chat_id, end_reason, emitter.emitted());

        StreamOutcome {
            state: StreamState::Aborted,
            end_reason,
            events: emitter.emitted(),
            error,
        }
    }
}

fn transition(chat_id: &str, from: StreamState, to: StreamState) {
    tracing::debug!(
        operation = LogOperation::Stream.as_str(),
        chat_id = chat_id,
        from = from.as_str(),
        to = to.as_str(),
        "Stream state transition"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EventKind, Message};
    use crate::infrastructure::llm::{LlmError, LlmMessage, TokenStream};
    use crate::infrastructure::retrieval::StaticRetriever;
    use crate::infrastructure::storage::InMemorySessionStore;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct FixedLlm(Vec<&'static str>);

    #[async_trait]
    impl LlmClient for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn generate_stream(&self, _messages: Vec<LlmMessage>) -> Result<TokenStream, LlmError> {
            let (tx, rx) = mpsc::channel(16);
            for token in &self.0 {
                tx.send(Ok(token.to_string())).await.unwrap();
            }
            Ok(rx)
        }
    }

    fn request(rag_enable: bool) -> ChatRequest {
        ChatRequest {
            rag_enable,
            chat_id: "c1".into(),
            message_id: "m1".into(),
            query: vec![Message::user("hello")],
        }
    }

    fn orchestrator(store: Arc<InMemorySessionStore>) -> StreamOrchestrator {
        StreamOrchestrator::new(
            store,
            Arc::new(FixedLlm(vec!["Hi", " there"])),
            Arc::new(StaticRetriever::sample()),
        )
    }

    async fn collect(mut rx: mpsc::Receiver<crate::stream::BodyChunk>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Some(chunk) = rx.recv().await {
            let event: ChatEvent = serde_json::from_str(chunk.unwrap().trim_end()).unwrap();
            kinds.push(event.kind());
        }
        kinds
    }

    #[tokio::test]
    async fn test_plain_run_completes_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let (emitter, rx) = EventEmitter::channel(16);

        let outcome = orchestrator(store.clone()).run(request(false), emitter).await;
        assert_eq!(outcome.state, StreamState::Done);
        assert_eq!(outcome.end_reason, Some(EndReason::Completed));
        assert_eq!(outcome.events, 4);
        assert_eq!(
            store.get("c1").await.unwrap(),
            Some(SessionStatus::Completed)
        );
        assert_eq!(
            collect(rx).await,
            vec![EventKind::Init, EventKind::Answer, EventKind::Answer, EventKind::End]
        );
    }

    #[tokio::test]
    async fn test_rag_run_emits_rewrite_and_search() {
        let store = Arc::new(InMemorySessionStore::new());
        let (emitter, rx) = EventEmitter::channel(16);

        let outcome = orchestrator(store).run(request(true), emitter).await;
        assert_eq!(outcome.end_reason, Some(EndReason::Completed));
        assert_eq!(
            collect(rx).await,
            vec![
                EventKind::Init,
                EventKind::QueryRewrite,
                EventKind::QueryRewrite,
                EventKind::Search,
                EventKind::Answer,
                EventKind::Answer,
                EventKind::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_dropped_client_ends_without_end_event() {
        let store = Arc::new(InMemorySessionStore::new());
        let (emitter, rx) = EventEmitter::channel(16);
        drop(rx);

        let outcome = orchestrator(store).run(request(false), emitter).await;
        assert_eq!(outcome.state, StreamState::Aborted);
        assert_eq!(outcome.end_reason, None);
        assert_eq!(outcome.events, 0);
    }
}
