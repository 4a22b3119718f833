//! NDJSON event emitter
//!
//! Each event becomes one self-contained line pushed into the channel that
//! backs the HTTP response body, so every record is its own body chunk.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::models::ChatEvent;

/// Items accepted by `axum::body::Body::from_stream`
pub type BodyChunk = Result<String, std::io::Error>;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Response stream closed by client")]
    Closed,
}

pub struct EventEmitter {
    tx: mpsc::Sender<BodyChunk>,
    emitted: usize,
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<BodyChunk>) -> Self {
        Self { tx, emitted: 0 }
    }

    /// Emitter plus the receiving end to hand to the response body
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<BodyChunk>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    /// Write one record. A closed transport is final; callers stop the run.
    pub async fn emit(&mut self, event: ChatEvent) -> Result<(), EmitError> {
        let line = event.to_ndjson()?;
        self.tx.send(Ok(line)).await.map_err(|_| EmitError::Closed)?;
        self.emitted += 1;
        Ok(())
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }
}
