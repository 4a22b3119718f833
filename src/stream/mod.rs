//! Streaming engine: the NDJSON emitter, the per-request orchestrator and
//! the halt handler that reaches it through the session store.

pub mod emitter;
pub mod halt;
pub mod orchestrator;

pub use emitter::{BodyChunk, EmitError, EventEmitter};
pub use halt::{HaltHandler, HaltReceipt};
pub use orchestrator::{StreamOrchestrator, StreamOutcome, StreamState};
