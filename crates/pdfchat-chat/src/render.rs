//! Pure rendering of one message into display parts.

use std::fmt;

use chrono::Local;
use pdfchat_core::{Message, Role};

/// Which side of the message list a bubble sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub alignment: Alignment,
    pub label: &'static str,
    /// Local `HH:MM` the message was appended at.
    pub time: String,
    pub lines: Vec<String>,
}

/// Map a message to its visual representation. User messages sit at the end
/// of the row, assistant messages at the start.
pub fn render_message(message: &Message) -> RenderedMessage {
    let (alignment, label) = match message.role {
        Role::User => (Alignment::End, "You"),
        Role::Assistant => (Alignment::Start, "Assistant"),
    };
    let mut lines: Vec<String> = message.content.lines().map(str::to_string).collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    RenderedMessage {
        alignment,
        label,
        time: message
            .created_at
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string(),
        lines,
    }
}

impl fmt::Display for RenderedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = match self.alignment {
            Alignment::Start => "",
            Alignment::End => "    ",
        };
        let header = format!("[{}] {}: ", self.time, self.label);
        let (first, rest) = match self.lines.split_first() {
            Some((first, rest)) => (first.as_str(), rest),
            None => ("", &[][..]),
        };
        write!(f, "{indent}{header}{first}")?;
        let pad = " ".repeat(header.chars().count());
        for line in rest {
            write!(f, "\n{indent}{pad}{line}")?;
        }
        Ok(())
    }
}
