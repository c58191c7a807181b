//! Data models for chat transcripts.

mod message;
mod session;

pub use message::{Message, MessageRole, QueryResults};
pub use session::ChatSession;
