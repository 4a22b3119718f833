//! Structured logging for the chat streaming service
//!
//! Keeps the recurring log lines consistent across the store, the stream
//! engine and the HTTP layer. Every line carries an `operation` field.

use tracing_subscriber::EnvFilter;

use crate::domain::models::{EndReason, SessionStatus};
use crate::pipeline::StageName;

#[derive(Debug, Clone, Copy)]
pub enum LogOperation {
    SessionStore,
    Stream,
    Stage,
    Halt,
    UserProfile,
}

impl LogOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogOperation::SessionStore => "session_store",
            LogOperation::Stream => "stream",
            LogOperation::Stage => "stage",
            LogOperation::Halt => "halt",
            LogOperation::UserProfile => "user_profile",
        }
    }
}

/// Install the global fmt subscriber (RUST_LOG, defaulting to info)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Log the one-time fallback to the in-process session map
pub fn log_backend_degraded(reason: &str) {
    tracing::warn!(
        operation = LogOperation::SessionStore.as_str(),
        backend = "in_memory",
        reason = reason,
        "Durable session store unreachable, falling back to in-process store"
    );
}

pub fn log_backend_selected(backend: &str) {
    tracing::info!(
        operation = LogOperation::SessionStore.as_str(),
        backend = backend,
        "Session store backend selected"
    );
}

pub fn log_stream_start(chat_id: &str, message_id: &str, rag_enable: bool) {
    tracing::info!(
        operation = LogOperation::Stream.as_str(),
        chat_id = chat_id,
        message_id = message_id,
        rag_enable = rag_enable,
        "Starting chat stream"
    );
}

pub fn log_stream_end(chat_id: &str, reason: Option<EndReason>, events: usize) {
    match reason {
        Some(reason) => tracing::info!(
            operation = LogOperation::Stream.as_str(),
            chat_id = chat_id,
            end_reason = reason.code(),
            events = events,
            "Chat stream finished"
        ),
        None => tracing::info!(
            operation = LogOperation::Stream.as_str(),
            chat_id = chat_id,
            events = events,
            "Chat stream dropped by client before End"
        ),
    }
}

/// Session observed as no longer active between fragments
pub fn log_stream_halted(chat_id: &str, stage: StageName) {
    tracing::info!(
        operation = LogOperation::Stream.as_str(),
        chat_id = chat_id,
        stage = stage.as_str(),
        "Session no longer active, stopping stream"
    );
}

pub fn log_stage_error(chat_id: &str, stage: StageName, error: &str) {
    tracing::error!(
        operation = LogOperation::Stage.as_str(),
        chat_id = chat_id,
        stage = stage.as_str(),
        error = error,
        "Pipeline stage failed"
    );
}

pub fn log_halt(chat_id: &str, previous: SessionStatus) {
    tracing::info!(
        operation = LogOperation::Halt.as_str(),
        chat_id = chat_id,
        previous_status = previous.as_str(),
        "Chat has been terminated"
    );
}

pub fn log_halt_error(chat_id: &str, error: &str) {
    tracing::warn!(
        operation = LogOperation::Halt.as_str(),
        chat_id = chat_id,
        error = error,
        "Failed to halt chat"
    );
}

pub fn log_user_saved(user_id: &str, created: bool) {
    tracing::info!(
        operation = LogOperation::UserProfile.as_str(),
        user_id = user_id,
        created = created,
        "User profile saved"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_operation_as_str() {
        assert_eq!(LogOperation::SessionStore.as_str(), "session_store");
        assert_eq!(LogOperation::Stream.as_str(), "stream");
        assert_eq!(LogOperation::Stage.as_str(), "stage");
        assert_eq!(LogOperation::Halt.as_str(), "halt");
        assert_eq!(LogOperation::UserProfile.as_str(), "user_profile");
    }
}
