use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content of the assistant message appended whenever a dispatch fails,
/// regardless of the underlying cause.
pub const SYNTHETIC_ERROR_MESSAGE: &str = "Sorry, there was an error processing your request.";

// =============================================================================
// Enums
// =============================================================================

/// Author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Typed or spoken by the person using the widget.
    User,
    /// Produced by the query service, or the synthetic failure message.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Interaction state of the widget.
///
/// Replaces the loose `busy` / `listening` / `speaking` flags with a single
/// value so that inconsistent combinations cannot be represented:
/// - Idle -> Listening (microphone started)
/// - Listening -> Idle (stopped, result or recognition error)
/// - Idle -> Dispatching (query submitted)
/// - Dispatching -> Idle (query resolved)
/// - Dispatching -> Speaking (playback started before the dispatch settled)
/// - Idle -> Speaking (playback started)
/// - Speaking -> Idle (playback ended or cancelled)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetState {
    /// Nothing in progress; controls enabled.
    #[default]
    Idle,
    /// Speech capture is active.
    Listening,
    /// A query is in flight.
    Dispatching,
    /// Speech playback is active.
    Speaking,
}

impl fmt::Display for WidgetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WidgetState::Idle => write!(f, "Idle"),
            WidgetState::Listening => write!(f, "Listening"),
            WidgetState::Dispatching => write!(f, "Dispatching"),
            WidgetState::Speaking => write!(f, "Speaking"),
        }
    }
}

impl WidgetState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &WidgetState) -> bool {
        matches!(
            (self, target),
            (WidgetState::Idle, WidgetState::Listening)
                | (WidgetState::Listening, WidgetState::Idle)
                | (WidgetState::Idle, WidgetState::Dispatching)
                | (WidgetState::Dispatching, WidgetState::Idle)
                | (WidgetState::Dispatching, WidgetState::Speaking)
                | (WidgetState::Idle, WidgetState::Speaking)
                | (WidgetState::Speaking, WidgetState::Idle)
        )
    }

    /// True while a dispatch is in flight.
    pub fn is_busy(&self) -> bool {
        *self == WidgetState::Dispatching
    }

    /// True while speech capture is active.
    pub fn is_listening(&self) -> bool {
        *self == WidgetState::Listening
    }

    /// True while speech playback is active.
    pub fn is_speaking(&self) -> bool {
        *self == WidgetState::Speaking
    }

    /// Input controls (text box, microphone, send) are disabled whenever the
    /// widget is busy or speaking.
    pub fn controls_enabled(&self) -> bool {
        !(self.is_busy() || self.is_speaking())
    }
}

// =============================================================================
// Messages
// =============================================================================

/// One entry of the conversation log. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The fixed assistant message standing in for any failed dispatch.
    pub fn synthetic_error() -> Self {
        Self::assistant(SYNTHETIC_ERROR_MESSAGE)
    }

    pub fn is_synthetic_error(&self) -> bool {
        self.role == Role::Assistant && self.content == SYNTHETIC_ERROR_MESSAGE
    }
}

// =============================================================================
// Wire types for the query service
// =============================================================================

/// Body of `POST /api/chat`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

/// Successful body returned by the query service.
///
/// Only `response` is interpreted; unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}
