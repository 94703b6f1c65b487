//! In-process speech engines for tests and headless front-ends.
//!
//! `MockSpeechInput` records every session and lets the caller script the
//! recognizer's events. `MockSpeechOutput` records every utterance, emits
//! `UtteranceStarted` as soon as it is asked to speak and `UtteranceEnded`
//! when [`MockSpeechOutput::complete`] is called.

use std::sync::Mutex;

use pdfchat_core::error::PdfChatError;
use pdfchat_core::Result;

use crate::capability::{
    RecognitionAlternative, RecognitionOptions, SessionId, SpeechEvent, SpeechEventSender,
    SpeechInput, SpeechOutput, Utterance, UtteranceId,
};

// ---------------------------------------------------------------------------
// MockSpeechInput
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct InputInner {
    started: Vec<SessionId>,
    stopped: Vec<SessionId>,
    active: Option<(SessionId, SpeechEventSender)>,
    last_sender: Option<SpeechEventSender>,
    last_options: Option<RecognitionOptions>,
}

#[derive(Debug)]
pub struct MockSpeechInput {
    available: bool,
    start_error: Option<String>,
    inner: Mutex<InputInner>,
}

impl Default for MockSpeechInput {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpeechInput {
    pub fn new() -> Self {
        Self {
            available: true,
            start_error: None,
            inner: Mutex::new(InputInner::default()),
        }
    }

    /// A recognizer that reports itself as missing from the runtime.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// A recognizer whose `start` fails with `code`.
    pub fn failing_start(code: impl Into<String>) -> Self {
        Self {
            start_error: Some(code.into()),
            ..Self::new()
        }
    }

    pub fn started_sessions(&self) -> Vec<SessionId> {
        self.lock().started.clone()
    }

    pub fn stopped_sessions(&self) -> Vec<SessionId> {
        self.lock().stopped.clone()
    }

    pub fn last_options(&self) -> Option<RecognitionOptions> {
        self.lock().last_options.clone()
    }

    /// The session currently capturing, if any.
    pub fn active_session(&self) -> Option<SessionId> {
        self.lock().active.as_ref().map(|(session, _)| *session)
    }

    /// Deliver a final transcript for the active session. Returns `false`
    /// when nothing is capturing.
    pub fn emit_result(&self, transcript: &str) -> bool {
        self.finish_with(|session| SpeechEvent::RecognitionResult {
            session,
            alternatives: vec![RecognitionAlternative::new(transcript)],
        })
    }

    /// Deliver a recognition error for the active session.
    pub fn emit_error(&self, code: &str) -> bool {
        self.finish_with(|session| SpeechEvent::RecognitionError {
            session,
            code: code.to_string(),
        })
    }

    /// Report that capture ended without a result.
    pub fn emit_end(&self) -> bool {
        self.finish_with(|session| SpeechEvent::RecognitionEnded { session })
    }

    /// Deliver an arbitrary event on the sender of the most recent session,
    /// even if that session was stopped.
    pub fn emit_raw(&self, event: SpeechEvent) -> bool {
        let inner = self.lock();
        match inner.last_sender.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    fn finish_with(&self, make: impl FnOnce(SessionId) -> SpeechEvent) -> bool {
        let mut inner = self.lock();
        match inner.active.take() {
            Some((session, tx)) => tx.send(make(session)).is_ok(),
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InputInner> {
        self.inner.lock().expect("mock input mutex poisoned")
    }
}

impl SpeechInput for MockSpeechInput {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start(
        &self,
        session: SessionId,
        options: &RecognitionOptions,
        events: SpeechEventSender,
    ) -> Result<()> {
        if let Some(code) = &self.start_error {
            return Err(PdfChatError::Speech(code.clone()));
        }
        let mut inner = self.lock();
        inner.started.push(session);
        inner.last_options = Some(options.clone());
        inner.last_sender = Some(events.clone());
        inner.active = Some((session, events));
        Ok(())
    }

    fn stop(&self, session: SessionId) {
        let mut inner = self.lock();
        inner.stopped.push(session);
        if inner.active.as_ref().is_some_and(|(s, _)| *s == session) {
            inner.active = None;
        }
    }
}

// ---------------------------------------------------------------------------
// MockSpeechOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct OutputInner {
    spoken: Vec<String>,
    cancels: usize,
    playing: Option<(UtteranceId, SpeechEventSender)>,
}

#[derive(Debug)]
pub struct MockSpeechOutput {
    available: bool,
    inner: Mutex<OutputInner>,
}

impl Default for MockSpeechOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpeechOutput {
    pub fn new() -> Self {
        Self {
            available: true,
            inner: Mutex::new(OutputInner::default()),
        }
    }

    /// A synthesizer that reports itself as missing from the runtime.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Every text handed to `speak`, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.lock().spoken.clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.lock().cancels
    }

    /// The utterance currently playing, if any.
    pub fn playing(&self) -> Option<UtteranceId> {
        self.lock().playing.as_ref().map(|(id, _)| *id)
    }

    /// Finish the playing utterance naturally. Returns `false` when nothing
    /// is playing.
    pub fn complete(&self) -> bool {
        let mut inner = self.lock();
        match inner.playing.take() {
            Some((utterance, tx)) => tx.send(SpeechEvent::UtteranceEnded { utterance }).is_ok(),
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, OutputInner> {
        self.inner.lock().expect("mock output mutex poisoned")
    }
}

impl SpeechOutput for MockSpeechOutput {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&self, utterance: &Utterance, events: SpeechEventSender) -> Result<()> {
        let mut inner = self.lock();
        inner.spoken.push(utterance.text.clone());
        let _ = events.send(SpeechEvent::UtteranceStarted {
            utterance: utterance.id,
        });
        inner.playing = Some((utterance.id, events));
        Ok(())
    }

    fn cancel(&self) {
        let mut inner = self.lock();
        inner.cancels += 1;
        inner.playing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_mock_input_scripted_result() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input = MockSpeechInput::new();
        let session = SessionId::new();
        input
            .start(session, &RecognitionOptions::default(), tx)
            .unwrap();
        assert_eq!(input.active_session(), Some(session));

        assert!(input.emit_result("summarize page two"));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.best_transcript(), Some("summarize page two"));
        assert_eq!(input.active_session(), None);
        assert!(!input.emit_result("again"));
    }

    #[test]
    fn test_mock_input_stop_clears_active() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let input = MockSpeechInput::new();
        let session = SessionId::new();
        input
            .start(session, &RecognitionOptions::default(), tx)
            .unwrap();
        input.stop(session);
        assert_eq!(input.stopped_sessions(), vec![session]);
        assert!(!input.emit_error("aborted"));
    }

    #[test]
    fn test_mock_output_complete_emits_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let output = MockSpeechOutput::new();
        let utterance = Utterance::new("hello");
        output.speak(&utterance, tx).unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            SpeechEvent::UtteranceStarted {
                utterance: utterance.id
            }
        );
        assert!(output.complete());
        assert_eq!(
            rx.try_recv().unwrap(),
            SpeechEvent::UtteranceEnded {
                utterance: utterance.id
            }
        );
        assert!(!output.complete());
    }

    #[test]
    fn test_mock_output_cancel_stops_playback() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let output = MockSpeechOutput::new();
        output.speak(&Utterance::new("hello"), tx).unwrap();
        let _started = rx.try_recv().unwrap();

        output.cancel();
        assert_eq!(output.cancel_count(), 1);
        assert_eq!(output.playing(), None);
        assert!(!output.complete());
        assert!(rx.try_recv().is_err());
    }
}
