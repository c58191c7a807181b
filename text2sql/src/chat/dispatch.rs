//! Reply dispatcher: runs responder calls as cancellable tasks.
//!
//! Every pending reply is tracked under the session id it answers, so a
//! caller can abort the replies of one session without touching others.
//! Delivery goes through [`ChatSessionManager::deliver_reply`] against the
//! manager state at fire time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, info};

use super::manager::{ChatSessionManager, Delivery, ManagerSnapshot, PendingReply};
use super::responder::Responder;
use crate::models::Message;

/// A unique identifier for a scheduled reply.
pub type ReplyId = usize;

type PendingMap = HashMap<String, HashMap<ReplyId, AbortHandle>>;

/// Event broadcast whenever chat state changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Manager state after a user-driven operation.
    Updated { snapshot: ManagerSnapshot },
    /// An assistant reply landed (or was dropped).
    Reply {
        session_id: String,
        delivery: Delivery,
        message: Message,
    },
}

/// Schedules assistant replies and delivers them into a shared manager.
pub struct ReplyDispatcher {
    manager: Arc<RwLock<ChatSessionManager>>,
    responder: Arc<dyn Responder>,
    pending: Arc<Mutex<PendingMap>>,
    next_id: AtomicUsize,
    events: broadcast::Sender<ChatEvent>,
}

impl ReplyDispatcher {
    pub fn new(
        manager: Arc<RwLock<ChatSessionManager>>,
        responder: Arc<dyn Responder>,
        events: broadcast::Sender<ChatEvent>,
    ) -> Self {
        Self {
            manager,
            responder,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicUsize::new(0),
            events,
        }
    }

    /// Spawn the reply task for `pending`. Must be called inside a tokio runtime.
    pub fn schedule(&self, pending: PendingReply) -> ReplyId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let manager = Arc::clone(&self.manager);
        let responder = Arc::clone(&self.responder);
        let registry = Arc::clone(&self.pending);
        let events = self.events.clone();
        let session_id = pending.session_id.clone();

        // Hold the registry while spawning so the task cannot finish before it is tracked.
        let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        let handle = tokio::spawn(async move {
            let message = responder.reply(&pending.prompt).await;

            let delivery = {
                let mut manager = manager.write().await;
                manager.deliver_reply(&pending.session_id, message.clone())
            };
            debug!(session_id = %pending.session_id, reply_id = id, ?delivery, "reply delivered");

            forget(&registry, &pending.session_id, id);
            let _ = events.send(ChatEvent::Reply {
                session_id: pending.session_id,
                delivery,
                message,
            });
        });

        guard
            .entry(session_id)
            .or_default()
            .insert(id, handle.abort_handle());
        id
    }

    /// Abort every outstanding reply for `session_id`. Returns how many were aborted.
    pub fn cancel(&self, session_id: &str) -> usize {
        let handles = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .unwrap_or_default();

        for handle in handles.values() {
            handle.abort();
        }
        if !handles.is_empty() {
            info!(session_id, cancelled = handles.len(), "pending replies cancelled");
        }
        handles.len()
    }

    /// Number of replies still outstanding for `session_id`.
    #[cfg(test)]
    pub fn pending_for(&self, session_id: &str) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .map_or(0, HashMap::len)
    }
}

fn forget(registry: &Mutex<PendingMap>, session_id: &str, id: ReplyId) {
    let mut map = registry.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(replies) = map.get_mut(session_id) {
        replies.remove(&id);
        if replies.is_empty() {
            map.remove(session_id);
        }
    }
}
