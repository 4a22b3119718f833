// Domain models shared by the stream engine and the HTTP layer

pub mod event;
pub mod message;
pub mod search;
pub mod session;
pub mod user;

pub use event::{ChatEvent, EndData, EndReason, EventKind, InitData, TextFragment, epoch_seconds};
pub use message::{ChatRequest, Message, Role};
pub use search::{Attachment, Author, Chunk, Document, Source};
pub use session::SessionStatus;
pub use user::{UserProfile, UserRecord};
