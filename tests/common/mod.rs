//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use rag_chat_backend::domain::models::{Attachment, ChatEvent, ChatRequest, Message, SessionStatus};
use rag_chat_backend::infrastructure::llm::{LlmClient, LlmError, LlmMessage, TokenStream};
use rag_chat_backend::infrastructure::retrieval::{RetrievalError, Retriever, StaticRetriever};
use rag_chat_backend::infrastructure::storage::{SessionStore, StoreError};
use rag_chat_backend::stream::BodyChunk;

/// One step of a scripted model response
#[derive(Clone)]
pub enum Step {
    Token(&'static str),
    Fail(&'static str),
    /// Park until the gate is notified
    Wait(Arc<Notify>),
}

/// How one `generate_stream` call behaves
#[derive(Clone)]
pub enum Script {
    Steps(Vec<Step>),
    Refuse(&'static str),
}

impl Script {
    pub fn tokens(tokens: &[&'static str]) -> Self {
        Script::Steps(tokens.iter().copied().map(Step::Token).collect())
    }
}

/// Model stub replaying one script per call, in order
#[derive(Default)]
pub struct ScriptedLlm {
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<Vec<LlmMessage>>>,
}

impl ScriptedLlm {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Prompts received so far, one entry per call
    pub fn calls(&self) -> Vec<Vec<LlmMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate_stream(&self, messages: Vec<LlmMessage>) -> Result<TokenStream, LlmError> {
        self.calls.lock().unwrap().push(messages);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Steps(vec![]));

        let steps = match script {
            Script::Refuse(reason) => return Err(LlmError::Stream(reason.to_string())),
            Script::Steps(steps) => steps,
        };

        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for step in steps {
                match step {
                    Step::Token(token) => {
                        if tx.send(Ok(token.to_string())).await.is_err() {
                            return;
                        }
                    }
                    Step::Fail(reason) => {
                        let _ = tx.send(Err(LlmError::Stream(reason.to_string()))).await;
                        return;
                    }
                    Step::Wait(gate) => gate.notified().await,
                }
            }
        });
        Ok(rx)
    }
}

/// Retriever that records queries and serves the bundled sample
#[derive(Default)]
pub struct RecordingRetriever {
    queries: Mutex<Vec<String>>,
}

impl RecordingRetriever {
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for RecordingRetriever {
    async fn search(&self, query: &str) -> Result<Attachment, RetrievalError> {
        self.queries.lock().unwrap().push(query.to_string());
        StaticRetriever::sample().search(query).await
    }
}

pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn search(&self, _query: &str) -> Result<Attachment, RetrievalError> {
        Err(RetrievalError::Io {
            path: "search-backend".to_string(),
            source: std::io::Error::other("connection refused"),
        })
    }
}

/// Store whose every call fails
pub struct BrokenStore;

#[async_trait]
impl SessionStore for BrokenStore {
    fn backend_name(&self) -> &'static str {
        "broken"
    }

    async fn get(&self, _chat_id: &str) -> Result<Option<SessionStatus>, StoreError> {
        Err(StoreError::Pool("unavailable".into()))
    }

    async fn set(&self, _chat_id: &str, _status: SessionStatus) -> Result<(), StoreError> {
        Err(StoreError::Pool("unavailable".into()))
    }

    async fn set_if_exists(
        &self,
        _chat_id: &str,
        _status: SessionStatus,
    ) -> Result<Option<SessionStatus>, StoreError> {
        Err(StoreError::Pool("unavailable".into()))
    }

    async fn compare_and_set(
        &self,
        _chat_id: &str,
        _from: SessionStatus,
        _to: SessionStatus,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Pool("unavailable".into()))
    }
}

pub fn chat_request(chat_id: &str, rag_enable: bool, content: &str) -> ChatRequest {
    ChatRequest {
        rag_enable,
        chat_id: chat_id.to_string(),
        message_id: "m1".to_string(),
        query: vec![Message::user(content)],
    }
}

pub fn parse_line(chunk: BodyChunk) -> ChatEvent {
    let line = chunk.expect("body chunk");
    assert!(line.ends_with('\n'), "record must end with a newline: {line:?}");
    serde_json::from_str(line.trim_end()).expect("valid NDJSON record")
}

pub async fn drain(rx: &mut mpsc::Receiver<BodyChunk>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Some(chunk) = rx.recv().await {
        events.push(parse_line(chunk));
    }
    events
}

/// `Init (QueryRewrite* Search)? Answer* End`
pub fn matches_grammar(events: &[ChatEvent], rag: bool) -> bool {
    use rag_chat_backend::domain::models::EventKind::*;

    let kinds: Vec<_> = events.iter().map(|e| e.kind()).collect();
    let Some((first, rest)) = kinds.split_first() else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return false;
    };
    if *first != Init || *last != End {
        return false;
    }

    let mut i = 0;
    if rag {
        while i < middle.len() && middle[i] == QueryRewrite {
            i += 1;
        }
        if i < middle.len() && middle[i] == Search {
            i += 1;
        }
    }
    middle[i..].iter().all(|k| *k == Answer)
}
