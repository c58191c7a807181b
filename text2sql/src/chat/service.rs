//! Shared chat state used by the server and the terminal REPL.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::info;

use super::dispatch::{ChatEvent, ReplyDispatcher};
use super::manager::{ChatSessionManager, ManagerSnapshot};
use super::responder::Responder;

/// One manager, its reply dispatcher and the change feed.
pub struct ChatService {
    manager: Arc<RwLock<ChatSessionManager>>,
    dispatcher: ReplyDispatcher,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatService {
    /// Build an initialized service around `manager`.
    pub fn new(mut manager: ChatSessionManager, responder: Arc<dyn Responder>) -> Self {
        manager.initialize();
        let manager = Arc::new(RwLock::new(manager));
        let (events, _rx) = broadcast::channel(256);
        let dispatcher = ReplyDispatcher::new(Arc::clone(&manager), responder, events.clone());
        Self {
            manager,
            dispatcher,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ManagerSnapshot {
        self.manager.read().await.snapshot()
    }

    /// Send user text; schedules the assistant reply when the text is not blank.
    pub async fn send(&self, text: &str) -> ManagerSnapshot {
        let (pending, snapshot) = {
            let mut manager = self.manager.write().await;
            let pending = manager.send_message(text);
            (pending, manager.snapshot())
        };

        if let Some(pending) = pending {
            info!(session_id = %pending.session_id, "message sent");
            self.dispatcher.schedule(pending);
            self.publish(&snapshot);
        }
        snapshot
    }

    pub async fn new_chat(&self) -> ManagerSnapshot {
        let snapshot = {
            let mut manager = self.manager.write().await;
            manager.new_chat();
            manager.snapshot()
        };
        self.publish(&snapshot);
        snapshot
    }

    /// Switch to `id`. `None` when the id is unknown.
    pub async fn switch_session(&self, id: &str) -> Option<ManagerSnapshot> {
        let snapshot = {
            let mut manager = self.manager.write().await;
            if !manager.switch_session(id) {
                return None;
            }
            manager.snapshot()
        };
        self.publish(&snapshot);
        Some(snapshot)
    }

    /// Abort pending replies for `session_id`.
    pub fn cancel_replies(&self, session_id: &str) -> usize {
        self.dispatcher.cancel(session_id)
    }

    fn publish(&self, snapshot: &ManagerSnapshot) {
        // No subscribers is fine.
        let _ = self.events.send(ChatEvent::Updated {
            snapshot: snapshot.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::manager::ManagerState;
    use crate::chat::responder::StubResponder;
    use std::time::Duration;

    fn service() -> ChatService {
        ChatService::new(
            ChatSessionManager::new(),
            Arc::new(StubResponder::new(Duration::from_millis(500))),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_from_fresh_start() {
        let service = service();

        let start = service.snapshot().await;
        assert_eq!(start.state, ManagerState::Draft);
        assert_eq!(start.sessions.len(), 1);
        assert_eq!(start.sessions[0].message_count, 2);

        let after_send = service.send("X").await;
        assert_eq!(after_send.state, ManagerState::Active);
        assert_eq!(after_send.active_messages.len(), 1);
        assert_eq!(after_send.sessions.len(), 2);
        assert_eq!(after_send.sessions[1].id, "demo");
        assert_eq!(after_send.sessions[1].message_count, 2);

        tokio::time::sleep(Duration::from_millis(600)).await;

        let settled = service.snapshot().await;
        assert_eq!(settled.active_messages.len(), 2);
        assert_eq!(settled.sessions[1].message_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_send_publishes_nothing() {
        let service = service();
        let mut rx = service.subscribe();

        let snapshot = service.send("   ").await;

        assert!(snapshot.active_messages.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_unknown_returns_none() {
        let service = service();
        assert!(service.switch_session("nope").await.is_none());
        assert!(service.switch_session("demo").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_reply() {
        let service = service();
        let snapshot = service.send("hello").await;
        let id = snapshot.active_session_id.unwrap();

        assert_eq!(service.cancel_replies(&id), 1);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(service.snapshot().await.active_messages.len(), 1);
    }
}
