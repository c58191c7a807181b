//! Chat session manager.
//!
//! Owns the saved session list and the working transcript of the active
//! session. Every operation is a synchronous in-memory mutation; the async
//! side (delayed assistant replies) lives in [`super::ReplyDispatcher`] and
//! comes back in through [`ChatSessionManager::deliver_reply`].
//!
//! States:
//! - `Uninitialized`: nothing seeded yet
//! - `Draft`: no active id, the working transcript is not in the history list
//! - `Active`: an id is active and the working transcript may run ahead of
//!   its stored copy until the next save point

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::demo::demo_session;
use crate::models::{ChatSession, Message};

/// Source of fresh session identifiers.
pub type IdSource = Box<dyn FnMut() -> String + Send + Sync>;

/// Generate a UUIDv7 (time-ordered, globally unique).
fn generate_uuid() -> String {
    Uuid::now_v7().to_string()
}

/// Lifecycle state of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerState {
    Uninitialized,
    Draft,
    Active,
}

/// Ticket for an assistant reply owed to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    /// Session that was active when the user message was sent.
    pub session_id: String,
    /// Trimmed user text the reply answers.
    pub prompt: String,
}

/// Where a delivered reply ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Appended to the working transcript.
    Active,
    /// Appended to the stored copy of a session that is no longer active.
    Rerouted,
    /// Target session unknown; reply dropped.
    Discarded,
}

/// History list entry for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
}

/// Serializable view of the whole manager.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerSnapshot {
    pub state: ManagerState,
    pub active_session_id: Option<String>,
    pub active_messages: Vec<Message>,
    pub sessions: Vec<SessionSummary>,
}

pub struct ChatSessionManager {
    sessions: Vec<ChatSession>,
    active_session_id: Option<String>,
    active_messages: Vec<Message>,
    initialized: bool,
    mint_id: IdSource,
}

impl std::fmt::Debug for ChatSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSessionManager")
            .field("sessions", &self.sessions.len())
            .field("active_session_id", &self.active_session_id)
            .field("active_messages", &self.active_messages.len())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl Default for ChatSessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSessionManager {
    /// Create an empty, uninitialized manager minting UUIDv7 session ids.
    pub fn new() -> Self {
        Self::with_id_source(Box::new(generate_uuid))
    }

    /// Create a manager with a custom id source.
    pub fn with_id_source(mint_id: IdSource) -> Self {
        Self {
            sessions: Vec::new(),
            active_session_id: None,
            active_messages: Vec::new(),
            initialized: false,
            mint_id,
        }
    }

    /// Seed the demo session. Only the first call has any effect.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        if self.sessions.is_empty() {
            self.sessions.push(demo_session());
            debug!("seeded demo session");
        }
    }

    /// Append a user message to the working transcript.
    ///
    /// Blank input is ignored. Otherwise the draft (if any) becomes a real
    /// session, the history list is updated, and the caller gets a ticket for
    /// the assistant reply owed to the active session.
    pub fn send_message(&mut self, text: &str) -> Option<PendingReply> {
        let content = text.trim();
        if content.is_empty() {
            return None;
        }

        let id = self.active_messages.len() as u64 + 1;
        self.active_messages.push(Message::user(id, content));

        let session_id = if let Some(active) = &self.active_session_id {
            active.clone()
        } else {
            let minted = self.mint_unique_id();
            debug!(session_id = %minted, "draft promoted to session");
            self.active_session_id = Some(minted.clone());
            minted
        };

        self.save_active_session();

        Some(PendingReply {
            session_id,
            prompt: content.to_string(),
        })
    }

    /// Write the working transcript back into the history list.
    ///
    /// Skipped for drafts and for empty transcripts.
    pub fn save_active_session(&mut self) {
        let Some(active_id) = &self.active_session_id else {
            return;
        };
        if self.active_messages.is_empty() {
            return;
        }

        if let Some(stored) = self.sessions.iter_mut().find(|s| &s.id == active_id) {
            stored.replace_messages(self.active_messages.clone());
        } else {
            self.sessions.insert(
                0,
                ChatSession::new(active_id.clone(), self.active_messages.clone()),
            );
        }
    }

    /// Save the current transcript, then start a fresh draft.
    pub fn new_chat(&mut self) {
        self.save_active_session();
        self.active_messages.clear();
        self.active_session_id = None;
    }

    /// Save the current transcript, then load session `id`.
    ///
    /// Returns `false` and leaves the working state alone when `id` is unknown.
    pub fn switch_session(&mut self, id: &str) -> bool {
        self.save_active_session();

        let Some(stored) = self.sessions.iter().find(|s| s.id == id) else {
            debug!(session_id = id, "switch to unknown session ignored");
            return false;
        };
        self.active_messages = stored.messages.clone();
        self.active_session_id = Some(stored.id.clone());
        true
    }

    /// Deliver an assistant reply owed to `session_id`.
    ///
    /// The reply is numbered against whichever transcript receives it at
    /// delivery time.
    pub fn deliver_reply(&mut self, session_id: &str, reply: Message) -> Delivery {
        if self.active_session_id.as_deref() == Some(session_id) {
            let id = self.active_messages.len() as u64 + 1;
            self.active_messages.push(reply.renumbered(id));
            return Delivery::Active;
        }

        if let Some(stored) = self.sessions.iter_mut().find(|s| s.id == session_id) {
            stored.push(reply);
            return Delivery::Rerouted;
        }

        debug!(session_id, "reply for unknown session discarded");
        Delivery::Discarded
    }

    pub fn state(&self) -> ManagerState {
        if !self.initialized {
            ManagerState::Uninitialized
        } else if self.active_session_id.is_some() {
            ManagerState::Active
        } else {
            ManagerState::Draft
        }
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    #[cfg(test)]
    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    #[cfg(test)]
    pub fn active_messages(&self) -> &[Message] {
        &self.active_messages
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            state: self.state(),
            active_session_id: self.active_session_id.clone(),
            active_messages: self.active_messages.clone(),
            sessions: self
                .sessions
                .iter()
                .map(|s| SessionSummary {
                    id: s.id.clone(),
                    title: s.title.clone(),
                    message_count: s.messages.len(),
                })
                .collect(),
        }
    }

    /// Mint an id not yet used in the history list.
    fn mint_unique_id(&mut self) -> String {
        let base = (self.mint_id)();
        let mut candidate = base.clone();
        let mut n = 2;
        while self.session(&candidate).is_some() {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        candidate
    }
}
