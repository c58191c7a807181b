//! Assistant reply sources.

use std::time::Duration;

use async_trait::async_trait;

use crate::models::Message;

/// Placeholder text the stub answers every prompt with.
pub const PLACEHOLDER_REPLY: &str = "I'm working on generating your SQL query...";

/// Default latency of the stub responder.
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(500);

/// Produces an assistant message for a user prompt.
///
/// The returned message id is provisional; the manager renumbers it when it
/// lands in a transcript.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, prompt: &str) -> Message;
}

/// Fixed-latency responder standing in for an inference backend.
#[derive(Debug, Clone)]
pub struct StubResponder {
    delay: Duration,
}

impl StubResponder {
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for StubResponder {
    fn default() -> Self {
        Self::new(DEFAULT_REPLY_DELAY)
    }
}

#[async_trait]
impl Responder for StubResponder {
    async fn reply(&self, _prompt: &str) -> Message {
        tokio::time::sleep(self.delay).await;
        Message::assistant(0, PLACEHOLDER_REPLY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    #[tokio::test(start_paused = true)]
    async fn test_stub_waits_then_answers() {
        let stub = StubResponder::new(Duration::from_millis(500));
        let start = tokio::time::Instant::now();

        let msg = stub.reply("anything").await;

        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, PLACEHOLDER_REPLY);
        assert!(msg.sql_code.is_none());
    }
}
