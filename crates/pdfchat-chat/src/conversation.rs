//! Conversation log and draft input.

use pdfchat_core::{Message, WidgetState};
use serde::Serialize;

/// Append-only message log plus the draft input text.
///
/// Messages are never reordered, edited or removed; the only way in is
/// [`Conversation::append`].
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    pending_input: String,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its index in the log.
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }
}

/// Point-in-time view of the widget for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub pending_input: String,
    pub busy: bool,
    pub listening: bool,
    pub speaking: bool,
}

impl ConversationState {
    pub fn new(conversation: &Conversation, state: WidgetState) -> Self {
        Self {
            messages: conversation.messages().to_vec(),
            pending_input: conversation.pending_input().to_string(),
            busy: state.is_busy(),
            listening: state.is_listening(),
            speaking: state.is_speaking(),
        }
    }

    /// Text box, microphone and send button are disabled while busy or
    /// speaking.
    pub fn controls_enabled(&self) -> bool {
        !(self.busy || self.speaking)
    }
}
