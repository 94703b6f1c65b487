//! Speech output adapter: at most one logically active utterance.

use std::sync::{Arc, Mutex};

use pdfchat_core::Result;

use crate::capability::{SpeechEventSender, SpeechOutput, Utterance, UtteranceId};

pub struct SpeechOutputAdapter {
    engine: Option<Arc<dyn SpeechOutput>>,
    events: SpeechEventSender,
    current: Mutex<Option<UtteranceId>>,
}

impl std::fmt::Debug for SpeechOutputAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechOutputAdapter")
            .field("has_engine", &self.engine.is_some())
            .field("current", &self.current)
            .finish()
    }
}

impl SpeechOutputAdapter {
    pub fn new(engine: Option<Arc<dyn SpeechOutput>>, events: SpeechEventSender) -> Self {
        Self {
            engine,
            events,
            current: Mutex::new(None),
        }
    }

    /// Whether a synthesizer is present and usable.
    pub fn is_available(&self) -> bool {
        self.engine.as_ref().is_some_and(|e| e.is_available())
    }

    /// The utterance currently owned by this adapter, if any.
    pub fn current(&self) -> Option<UtteranceId> {
        *self.current.lock().expect("utterance mutex poisoned")
    }

    /// Hand `text` to the synthesizer, superseding any active utterance.
    ///
    /// Returns `Ok(None)` when no synthesizer is available.
    pub fn speak(&self, text: &str) -> Result<Option<UtteranceId>> {
        let engine = match self.engine.as_ref() {
            Some(engine) if engine.is_available() => engine,
            _ => {
                tracing::debug!("Speech synthesis unavailable; speak ignored");
                return Ok(None);
            }
        };

        let mut current = self.current.lock().expect("utterance mutex poisoned");
        if let Some(previous) = current.take() {
            tracing::debug!(utterance = %previous, "Superseding active utterance");
            engine.cancel();
        }

        let utterance = Utterance::new(text);
        engine.speak(&utterance, self.events.clone())?;
        tracing::info!(utterance = %utterance.id, chars = text.chars().count(), "Utterance queued");
        *current = Some(utterance.id);
        Ok(Some(utterance.id))
    }

    /// Cancel playback immediately. Returns the utterance that was active.
    pub fn cancel(&self) -> Option<UtteranceId> {
        let utterance = self.current.lock().expect("utterance mutex poisoned").take()?;
        if let Some(engine) = self.engine.as_ref() {
            engine.cancel();
        }
        tracing::info!(utterance = %utterance, "Playback cancelled");
        Some(utterance)
    }

    /// Whether a start event for `utterance` should be honored.
    pub fn is_current(&self, utterance: UtteranceId) -> bool {
        self.current() == Some(utterance)
    }

    /// Release `utterance` after the engine reported its end (or failure).
    ///
    /// Returns `false` for superseded or cancelled utterances.
    pub fn finish(&self, utterance: UtteranceId) -> bool {
        let mut current = self.current.lock().expect("utterance mutex poisoned");
        if *current == Some(utterance) {
            *current = None;
            true
        } else {
            tracing::debug!(utterance = %utterance, "Ignoring event from stale utterance");
            false
        }
    }
}
