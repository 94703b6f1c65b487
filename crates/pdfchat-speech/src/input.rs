//! Speech input adapter: one recognition session at a time.
//!
//! The adapter owns the optional recognizer and remembers the current
//! session. Results and errors are only honored for that session; anything
//! arriving for a stopped or superseded session is dropped.

use std::sync::{Arc, Mutex};

use pdfchat_core::Result;

use crate::capability::{RecognitionOptions, SessionId, SpeechEventSender, SpeechInput};

pub struct SpeechInputAdapter {
    engine: Option<Arc<dyn SpeechInput>>,
    options: RecognitionOptions,
    events: SpeechEventSender,
    current: Mutex<Option<SessionId>>,
}

impl std::fmt::Debug for SpeechInputAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechInputAdapter")
            .field("has_engine", &self.engine.is_some())
            .field("options", &self.options)
            .field("current", &self.current)
            .finish()
    }
}

impl SpeechInputAdapter {
    pub fn new(
        engine: Option<Arc<dyn SpeechInput>>,
        options: RecognitionOptions,
        events: SpeechEventSender,
    ) -> Self {
        Self {
            engine,
            options,
            events,
            current: Mutex::new(None),
        }
    }

    /// Whether a recognizer is present and usable.
    pub fn is_available(&self) -> bool {
        self.engine.as_ref().is_some_and(|e| e.is_available())
    }

    /// Whether a recognition session is running.
    pub fn is_active(&self) -> bool {
        self.current.lock().expect("session mutex poisoned").is_some()
    }

    pub fn options(&self) -> &RecognitionOptions {
        &self.options
    }

    pub fn engine(&self) -> Option<Arc<dyn SpeechInput>> {
        self.engine.clone()
    }

    /// Begin a new recognition session.
    ///
    /// Returns `Ok(None)` without side effects when no recognizer is
    /// available or a session is already running.
    pub fn start(&self) -> Result<Option<SessionId>> {
        let engine = match self.engine.as_ref() {
            Some(engine) if engine.is_available() => engine,
            _ => {
                tracing::debug!("Speech recognition unavailable; start ignored");
                return Ok(None);
            }
        };

        let mut current = self.current.lock().expect("session mutex poisoned");
        if current.is_some() {
            return Ok(None);
        }

        let session = SessionId::new();
        engine.start(session, &self.options, self.events.clone())?;
        tracing::info!(session = %session, locale = %self.options.locale, "Recognition started");
        *current = Some(session);
        Ok(Some(session))
    }

    /// Cancel the running session, if any. Returns the session that was
    /// stopped.
    pub fn stop(&self) -> Option<SessionId> {
        let session = self.current.lock().expect("session mutex poisoned").take()?;
        if let Some(engine) = self.engine.as_ref() {
            engine.stop(session);
        }
        tracing::info!(session = %session, "Recognition stopped");
        Some(session)
    }

    /// Close `session` after the engine reported a result, an error or the
    /// end of capture.
    ///
    /// Returns `false` when `session` is not the current one, in which case
    /// the event must be ignored.
    pub fn finish(&self, session: SessionId) -> bool {
        let mut current = self.current.lock().expect("session mutex poisoned");
        if *current == Some(session) {
            *current = None;
            true
        } else {
            tracing::debug!(session = %session, "Ignoring event from stale recognition session");
            false
        }
    }
}
