//! Chat widget for asking questions about a PDF.
//!
//! Keeps the conversation log, dispatches queries to the remote query
//! service, and coordinates speech capture and playback through the
//! [`ChatWidget`] state machine.

pub mod client;
pub mod conversation;
pub mod error;
pub mod render;
pub mod widget;

pub use client::{HttpQueryClient, QueryClient};
pub use conversation::{Conversation, ConversationState};
pub use error::DispatchError;
pub use render::{render_message, Alignment, RenderedMessage};
pub use widget::{ChatWidget, SubmitOutcome};
