use serde::{Deserialize, Serialize};

use crate::types::{Message, WidgetState};

/// Observable changes of the chat widget.
///
/// Emitted after each state change and consumed by:
/// - The rendering layer (redraw the message list, toggle controls)
/// - Diagnostics (structured log of the interaction)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum WidgetEvent {
    /// A message was appended to the conversation log.
    MessageAppended { index: usize, message: Message },

    /// The draft input text changed (typed, transcribed or cleared).
    PendingInputChanged { text: String },

    /// The interaction state machine moved.
    StateChanged {
        from: WidgetState,
        to: WidgetState,
    },

    /// The speech-to-text capability reported an error code.
    SpeechError { code: String },
}

impl WidgetEvent {
    /// Returns a short, stable name for the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WidgetEvent::MessageAppended { .. } => "message_appended",
            WidgetEvent::PendingInputChanged { .. } => "pending_input_changed",
            WidgetEvent::StateChanged { .. } => "state_changed",
            WidgetEvent::SpeechError { .. } => "speech_error",
        }
    }
}
