//! Conversation history seen by the orchestrator.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Rough characters-per-token ratio used for size estimates.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn estimated_tokens(&self) -> usize {
        self.content.chars().count().div_ceil(CHARS_PER_TOKEN)
    }
}

/// Storage the orchestrator appends turns to and shrinks on token-limit errors.
pub trait HistoryStore {
    fn append(&mut self, message: Message);

    /// All messages, oldest first.
    fn all(&self) -> &[Message];

    fn clear(&mut self);

    /// Drops older history to reduce request size; returns how many messages
    /// were removed. Zero means nothing more can be removed.
    fn auto_shrink(&mut self) -> usize;
}

/// In-memory history.
///
/// `auto_shrink` removes the oldest half (rounded up) of the messages that
/// precede the most recent one. The most recent message is never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHistory {
    messages: Vec<Message>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(Message::estimated_tokens).sum()
    }
}

impl HistoryStore for MessageHistory {
    fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn all(&self) -> &[Message] {
        &self.messages
    }

    fn clear(&mut self) {
        self.messages.clear();
    }

    fn auto_shrink(&mut self) -> usize {
        let older = self.messages.len().saturating_sub(1);
        let remove = older.div_ceil(2);
        if remove == 0 {
            return 0;
        }

        let before = self.estimated_tokens();
        self.messages.drain(..remove);
        info!(
            removed = remove,
            remaining = self.messages.len(),
            tokens_before = before,
            tokens_after = self.estimated_tokens(),
            "history shrunk"
        );
        remove
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryStore, Message, MessageHistory};

    fn history(contents: &[&str]) -> MessageHistory {
        MessageHistory::with_messages(contents.iter().map(|text| Message::user(*text)).collect())
    }

    #[test]
    fn auto_shrink_drops_oldest_half_and_keeps_latest() {
        let mut history = history(&["a", "b", "c", "d", "e"]);

        assert_eq!(history.auto_shrink(), 2);
        let remaining: Vec<&str> = history.all().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(remaining, vec!["c", "d", "e"]);

        assert_eq!(history.auto_shrink(), 1);
        assert_eq!(history.auto_shrink(), 1);
        assert_eq!(history.all(), &[Message::user("e")]);
    }

    #[test]
    fn auto_shrink_reports_zero_when_only_latest_remains() {
        let mut single = history(&["huge prompt"]);
        assert_eq!(single.auto_shrink(), 0);
        assert_eq!(single.len(), 1);

        let mut empty = MessageHistory::new();
        assert_eq!(empty.auto_shrink(), 0);
    }

    #[test]
    fn auto_shrink_always_terminates() {
        let mut history = history(&["x"; 37]);
        let mut rounds = 0;
        while history.auto_shrink() > 0 {
            rounds += 1;
            assert!(rounds < 37, "shrink must make progress");
        }
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn token_estimate_rounds_up_per_message() {
        let history = history(&["abcd", "abcde", ""]);
        assert_eq!(history.estimated_tokens(), 1 + 2);
    }

    #[test]
    fn clear_removes_everything() {
        let mut history = history(&["a", "b"]);
        history.clear();
        assert!(history.is_empty());
        assert!(history.last().is_none());
    }
}
