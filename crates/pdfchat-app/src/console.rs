//! Terminal speech engines and status output.
//!
//! The terminal has no microphone or speaker, so "speech" is text: while
//! listening, the next line typed is delivered as the recognized transcript,
//! and utterances are printed instead of played.

use std::io::Write;
use std::sync::Mutex;

use pdfchat_chat::ConversationState;
use pdfchat_core::{Result, WidgetState};
use pdfchat_speech::{
    RecognitionAlternative, RecognitionOptions, SessionId, SpeechEvent, SpeechEventSender,
    SpeechInput, SpeechOutput, Utterance,
};

/// Recognizer fed by lines typed while the microphone is on.
#[derive(Debug, Default)]
pub struct ConsoleSpeechInput {
    active: Mutex<Option<(SessionId, SpeechEventSender)>>,
}

impl ConsoleSpeechInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_capturing(&self) -> bool {
        self.active.lock().expect("console input mutex poisoned").is_some()
    }

    /// Deliver `line` as the final transcript of the running session.
    /// Returns `false` when nothing is capturing.
    pub fn deliver(&self, line: &str) -> bool {
        let active = self.active.lock().expect("console input mutex poisoned").take();
        match active {
            Some((session, events)) => events
                .send(SpeechEvent::RecognitionResult {
                    session,
                    alternatives: vec![RecognitionAlternative::new(line)],
                })
                .is_ok(),
            None => false,
        }
    }
}

impl SpeechInput for ConsoleSpeechInput {
    fn start(
        &self,
        session: SessionId,
        options: &RecognitionOptions,
        events: SpeechEventSender,
    ) -> Result<()> {
        tracing::debug!(session = %session, locale = %options.locale, "Console capture started");
        *self.active.lock().expect("console input mutex poisoned") = Some((session, events));
        Ok(())
    }

    fn stop(&self, session: SessionId) {
        let mut active = self.active.lock().expect("console input mutex poisoned");
        if active.as_ref().is_some_and(|(s, _)| *s == session) {
            *active = None;
        }
    }
}

/// Synthesizer that prints each utterance and finishes it at once.
pub struct ConsoleSpeechOutput {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSpeechOutput {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl SpeechOutput for ConsoleSpeechOutput {
    fn speak(&self, utterance: &Utterance, events: SpeechEventSender) -> Result<()> {
        let _ = events.send(SpeechEvent::UtteranceStarted {
            utterance: utterance.id,
        });
        {
            let mut out = self.out.lock().expect("console output mutex poisoned");
            writeln!(out, "[speaking] {}", utterance.text)?;
            out.flush()?;
        }
        let _ = events.send(SpeechEvent::UtteranceEnded {
            utterance: utterance.id,
        });
        Ok(())
    }

    fn cancel(&self) {
        tracing::debug!("Console playback cancelled");
    }
}

/// One-line indicator printed when the widget enters `state`.
pub fn status_line(state: WidgetState) -> Option<&'static str> {
    match state {
        WidgetState::Dispatching => Some("(thinking...)"),
        WidgetState::Speaking => Some("(speaking; /stop to interrupt)"),
        WidgetState::Idle | WidgetState::Listening => None,
    }
}

/// Summary printed by `/status`.
pub fn status_summary(state: &ConversationState) -> String {
    let activity = if state.busy {
        "waiting for an answer"
    } else if state.speaking {
        "speaking"
    } else if state.listening {
        "listening"
    } else {
        "idle"
    };
    let mut summary = format!("({} messages, {activity}", state.messages.len());
    if !state.pending_input.is_empty() {
        summary.push_str(&format!(", draft: {:?}", state.pending_input));
    }
    summary.push(')');
    summary
}
