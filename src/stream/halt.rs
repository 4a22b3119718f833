use std::sync::Arc;

use serde::Serialize;

use crate::domain::models::SessionStatus;
use crate::infrastructure::storage::SessionStore;
use crate::shared::logging::{log_halt, log_halt_error};
use crate::shared::{AppError, Result};

/// Acknowledgement of a halt, with the status it replaced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HaltReceipt {
    pub chat_id: String,
    pub previous: SessionStatus,
}

/// Marks sessions as terminated.
///
/// Has no handle on running streams: the orchestrator notices the new
/// status at its next fragment check.
#[derive(Clone)]
pub struct HaltHandler {
    store: Arc<dyn SessionStore>,
}

impl HaltHandler {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Set the session to terminated. Idempotent, and valid on completed
    /// sessions; unknown ids fail with `SessionNotFound`.
    pub async fn halt(&self, chat_id: &str) -> Result<HaltReceipt> {
        // Ids are opaque: blank ones are rejected, others are used verbatim
        if chat_id.trim().is_empty() {
            return Err(AppError::InvalidRequest("chat_id must not be empty".into()));
        }

        let previous = self
            .store
            .set_if_exists(chat_id, SessionStatus::Terminated)
            .await
            .inspect_err(|e| log_halt_error(chat_id, &e.to_string()))?;

        match previous {
            Some(previous) => {
                log_halt(chat_id, previous);
                Ok(HaltReceipt {
                    chat_id: chat_id.to_string(),
                    previous,
                })
            }
            None => {
                log_halt_error(chat_id, "session not found");
                Err(AppError::SessionNotFound(chat_id.to_string()))
            }
        }
    }
}
