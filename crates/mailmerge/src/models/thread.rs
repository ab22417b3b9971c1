//! Thread model representing an existing conversation

use serde::{Deserialize, Serialize};

use super::ThreadMessage;

/// Unique identifier for a thread (Gmail thread ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A conversation returned by a thread search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailThread {
    pub id: ThreadId,
    /// Messages ordered oldest first
    pub messages: Vec<ThreadMessage>,
}

impl MailThread {
    pub fn new(id: ThreadId, messages: Vec<ThreadMessage>) -> Self {
        Self { id, messages }
    }

    /// The most recent message in the thread
    pub fn last_message(&self) -> Option<&ThreadMessage> {
        self.messages.last()
    }
}
