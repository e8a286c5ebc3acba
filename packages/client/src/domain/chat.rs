//! Chat relay.

/// One displayed chat line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub username: String,
    pub message: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// Ordered message list: replaced by history, appended by live messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
}

impl ChatLog {
    pub fn replace(&mut self, entries: Vec<ChatEntry>) {
        self.entries = entries;
    }

    pub fn append(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }
}

/// Text to send for a chat input, or `None` when the input is blank
pub fn outgoing(input: &str) -> Option<&str> {
    if input.trim().is_empty() {
        None
    } else {
        Some(input)
    }
}
