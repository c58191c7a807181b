//! Chat session model: a titled transcript.

use serde::{Deserialize, Serialize};

use super::Message;

/// Number of characters kept from the first message when deriving a title.
pub const TITLE_MAX_CHARS: usize = 30;

/// Title used for a session that has no messages yet.
pub const UNTITLED: &str = "New Chat";

/// Derive a session title from the first message content.
///
/// The ellipsis is appended unconditionally, short content included.
pub fn derive_title(content: &str) -> String {
    let head: String = content.chars().take(TITLE_MAX_CHARS).collect();
    format!("{head}...")
}

/// A chat session as stored in the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Identifier fixed at creation.
    pub id: String,
    /// Title derived from the first message.
    pub title: String,
    /// Transcript in chronological order.
    pub messages: Vec<Message>,
}

impl ChatSession {
    /// Create a session holding `messages`, titled from the first one.
    pub fn new(id: impl Into<String>, messages: Vec<Message>) -> Self {
        let mut session = Self {
            id: id.into(),
            title: String::new(),
            messages,
        };
        session.retitle();
        session
    }

    /// Replace the transcript and recompute the title.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.retitle();
    }

    /// Append a message, numbering it after the current last one.
    pub fn push(&mut self, message: Message) {
        let id = self.messages.len() as u64 + 1;
        self.messages.push(message.renumbered(id));
        self.retitle();
    }

    fn retitle(&mut self) {
        self.title = self
            .messages
            .first()
            .map_or_else(|| UNTITLED.to_string(), |m| derive_title(&m.content));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_title_gets_ellipsis() {
        assert_eq!(derive_title("Show revenue"), "Show revenue...");
    }

    #[test]
    fn test_long_title_truncated_to_thirty_chars() {
        let content = "Show me total revenue by category for orders";
        assert_eq!(derive_title(content), "Show me total revenue by categ...");
    }

    #[test]
    fn test_exactly_thirty_chars() {
        let content = "a".repeat(30);
        assert_eq!(derive_title(&content), format!("{content}..."));
    }

    #[test]
    fn test_title_counts_chars_not_bytes() {
        let content = "é".repeat(40);
        assert_eq!(derive_title(&content), format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn test_empty_session_title() {
        let session = ChatSession::new("s1", Vec::new());
        assert_eq!(session.title, UNTITLED);
    }

    #[test]
    fn test_push_numbers_sequentially() {
        let mut session = ChatSession::new("s1", vec![Message::user(1, "hi")]);
        session.push(Message::assistant(0, "hello"));
        assert_eq!(session.messages[1].id, 2);
        assert_eq!(session.title, "hi...");
    }
}
