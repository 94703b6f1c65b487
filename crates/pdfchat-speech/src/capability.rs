//! Capability interfaces for speech engines.
//!
//! Engines are constructed once and handed to the widget. Every operation
//! returns immediately; progress is reported asynchronously as
//! [`SpeechEvent`]s on the sender passed into `start` / `speak`.

use std::fmt;

use pdfchat_core::config::SpeechConfig;
use pdfchat_core::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifies one recognition session (one `start` call).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies one utterance handed to the synthesizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtteranceId(Uuid);

impl UtteranceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UtteranceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Settings applied to every recognition session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionOptions {
    /// Stop after the first utterance.
    pub continuous: bool,
    /// Only final transcripts are delivered when false.
    pub interim_results: bool,
    /// BCP 47 locale tag.
    pub locale: String,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            continuous: false,
            interim_results: false,
            locale: "en-US".to_string(),
        }
    }
}

impl From<&SpeechConfig> for RecognitionOptions {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            continuous: config.continuous,
            interim_results: config.interim_results,
            locale: config.locale.clone(),
        }
    }
}

/// One candidate transcript for a recognized utterance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognitionAlternative {
    pub transcript: String,
}

impl RecognitionAlternative {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

/// A text string submitted for playback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: UtteranceId::new(),
            text: text.into(),
        }
    }
}

/// Lifecycle events emitted by speech engines.
#[derive(Clone, Debug, PartialEq)]
pub enum SpeechEvent {
    /// Final result of a recognition session. Alternatives are ordered by
    /// the engine, best first.
    RecognitionResult {
        session: SessionId,
        alternatives: Vec<RecognitionAlternative>,
    },
    /// The recognizer failed (e.g. `no-speech`, `not-allowed`).
    RecognitionError { session: SessionId, code: String },
    /// The recognizer stopped capturing without a result.
    RecognitionEnded { session: SessionId },
    /// Playback of an utterance began.
    UtteranceStarted { utterance: UtteranceId },
    /// Playback of an utterance completed.
    UtteranceEnded { utterance: UtteranceId },
    /// The synthesizer failed to play an utterance.
    UtteranceError { utterance: UtteranceId, code: String },
}

impl SpeechEvent {
    /// Best single transcript of a recognition result, if any.
    pub fn best_transcript(&self) -> Option<&str> {
        match self {
            SpeechEvent::RecognitionResult { alternatives, .. } => {
                alternatives.first().map(|a| a.transcript.as_str())
            }
            _ => None,
        }
    }
}

pub type SpeechEventSender = mpsc::UnboundedSender<SpeechEvent>;
pub type SpeechEventReceiver = mpsc::UnboundedReceiver<SpeechEvent>;

/// Speech-to-text engine.
///
/// Single-shot: one `start` yields at most one `RecognitionResult` or one
/// `RecognitionError` for that session.
pub trait SpeechInput: Send + Sync {
    /// Whether the engine can be used in this runtime.
    fn is_available(&self) -> bool {
        true
    }

    /// Begin capturing audio for `session`.
    fn start(
        &self,
        session: SessionId,
        options: &RecognitionOptions,
        events: SpeechEventSender,
    ) -> Result<()>;

    /// Stop capturing for `session`.
    fn stop(&self, session: SessionId);
}

/// Text-to-speech engine.
pub trait SpeechOutput: Send + Sync {
    /// Whether the engine can be used in this runtime.
    fn is_available(&self) -> bool {
        true
    }

    /// Queue `utterance` for playback.
    fn speak(&self, utterance: &Utterance, events: SpeechEventSender) -> Result<()>;

    /// Cancel playback immediately, including anything queued.
    fn cancel(&self);
}
