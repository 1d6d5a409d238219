use super::types::ChatMessage;

/// Append-only chat log in arrival order. No dedup, no reordering.
#[derive(Debug, Clone, Default)]
pub struct ChatAggregator {
    messages: Vec<ChatMessage>,
}

impl ChatAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
