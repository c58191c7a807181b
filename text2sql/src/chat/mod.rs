//! Chat sessions: the manager state machine and its async reply path.

mod demo;
pub mod display;
mod dispatch;
mod manager;
mod responder;
mod service;

pub use dispatch::ChatEvent;
pub use manager::{ChatSessionManager, Delivery, ManagerSnapshot};
pub use responder::StubResponder;
pub use service::ChatService;
