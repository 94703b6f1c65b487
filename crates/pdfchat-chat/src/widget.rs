//! Chat widget: central coordinator wiring the conversation log, the query
//! client and both speech adapters.
//!
//! All interaction goes through a single [`StateMachine`]; the `busy`,
//! `listening` and `speaking` flags are views of its [`WidgetState`].
//! Submissions are serialized: a query submitted while another is in flight
//! waits for it to resolve before its own user message is appended.

use std::sync::{Arc, Mutex};

use pdfchat_core::config::PdfChatConfig;
use pdfchat_core::error::PdfChatError;
use pdfchat_core::{Message, WidgetEvent, WidgetState};
use pdfchat_speech::{
    RecognitionOptions, SpeechEvent, SpeechEventReceiver, SpeechEventSender, SpeechInput,
    SpeechInputAdapter, SpeechOutput, SpeechOutputAdapter, StateMachine,
};
use tokio::sync::{broadcast, mpsc};

use crate::client::QueryClient;
use crate::conversation::{Conversation, ConversationState};

/// Capacity of the widget event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of one `submit_query` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing changed and no request was sent.
    Ignored,
    /// The service answered and its reply was appended.
    Answered,
    /// The dispatch failed and the synthetic message was appended.
    Failed,
}

pub struct ChatWidget {
    conversation: Mutex<Conversation>,
    machine: StateMachine,
    client: Arc<dyn QueryClient>,
    input: SpeechInputAdapter,
    output: SpeechOutputAdapter,
    dispatch_gate: tokio::sync::Mutex<()>,
    speech_tx: SpeechEventSender,
    speech_rx: tokio::sync::Mutex<SpeechEventReceiver>,
    event_tx: broadcast::Sender<WidgetEvent>,
}

impl std::fmt::Debug for ChatWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatWidget")
            .field("conversation", &self.conversation)
            .field("machine", &self.machine)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

impl ChatWidget {
    /// Create a widget with no speech engines attached.
    pub fn new(client: Arc<dyn QueryClient>) -> Self {
        let (speech_tx, speech_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            conversation: Mutex::new(Conversation::new()),
            machine: StateMachine::new(),
            client,
            input: SpeechInputAdapter::new(None, RecognitionOptions::default(), speech_tx.clone()),
            output: SpeechOutputAdapter::new(None, speech_tx.clone()),
            dispatch_gate: tokio::sync::Mutex::new(()),
            speech_tx,
            speech_rx: tokio::sync::Mutex::new(speech_rx),
            event_tx,
        }
    }

    /// Create a widget from configuration. Engines are dropped when the
    /// matching `speech.*_enabled` flag is off.
    pub fn from_config(
        config: &PdfChatConfig,
        client: Arc<dyn QueryClient>,
        input: Option<Arc<dyn SpeechInput>>,
        output: Option<Arc<dyn SpeechOutput>>,
    ) -> Self {
        let mut widget = Self::new(client)
            .with_recognition_options(RecognitionOptions::from(&config.speech));
        if let Some(engine) = input.filter(|_| config.speech.input_enabled) {
            widget = widget.with_speech_input(engine);
        }
        if let Some(engine) = output.filter(|_| config.speech.output_enabled) {
            widget = widget.with_speech_output(engine);
        }
        widget
    }

    /// Attach a speech-to-text engine.
    pub fn with_speech_input(mut self, engine: Arc<dyn SpeechInput>) -> Self {
        let options = self.input.options().clone();
        self.input = SpeechInputAdapter::new(Some(engine), options, self.speech_tx.clone());
        self
    }

    /// Attach a text-to-speech engine.
    pub fn with_speech_output(mut self, engine: Arc<dyn SpeechOutput>) -> Self {
        self.output = SpeechOutputAdapter::new(Some(engine), self.speech_tx.clone());
        self
    }

    /// Override the recognition settings (locale, continuous, interim).
    pub fn with_recognition_options(mut self, options: RecognitionOptions) -> Self {
        self.input = SpeechInputAdapter::new(self.input_engine(), options, self.speech_tx.clone());
        self
    }

    // -- Observers --

    /// Subscribe to widget events (message appended, state changed, ...).
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> WidgetState {
        self.machine.current()
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    pub fn is_listening(&self) -> bool {
        self.state().is_listening()
    }

    pub fn is_speaking(&self) -> bool {
        self.state().is_speaking()
    }

    pub fn controls_enabled(&self) -> bool {
        self.state().controls_enabled()
    }

    pub fn speech_input_available(&self) -> bool {
        self.input.is_available()
    }

    pub fn speech_output_available(&self) -> bool {
        self.output.is_available()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock_conversation().messages().to_vec()
    }

    pub fn pending_input(&self) -> String {
        self.lock_conversation().pending_input().to_string()
    }

    /// Point-in-time copy of the log, draft and flags.
    pub fn snapshot(&self) -> ConversationState {
        let state = self.state();
        ConversationState::new(&self.lock_conversation(), state)
    }

    // -- Typed input --

    /// Edit the draft. Ignored while the controls are disabled.
    pub fn set_pending_input(&self, text: impl Into<String>) -> bool {
        if !self.controls_enabled() {
            return false;
        }
        self.write_pending_input(text.into());
        true
    }

    /// Submit the current draft (the send button).
    pub async fn submit_pending(&self) -> SubmitOutcome {
        if !self.controls_enabled() {
            return SubmitOutcome::Ignored;
        }
        let text = self.pending_input();
        self.submit_query(&text).await
    }

    // -- Query dispatch --

    /// Send `text` to the query service and append the outcome.
    ///
    /// Blank text is ignored. Otherwise the user message is appended, the
    /// draft cleared and the widget marked busy before the request is sent;
    /// the reply (or the synthetic failure message) is appended and spoken
    /// once it resolves, and the busy flag is always cleared afterwards.
    pub async fn submit_query(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            tracing::debug!("Ignoring blank query");
            return SubmitOutcome::Ignored;
        }

        let _turn = self.dispatch_gate.lock().await;

        self.begin_dispatch(text);
        tracing::info!(chars = text.chars().count(), "Dispatching query");

        let (reply, outcome) = match self.client.query(text).await {
            Ok(response) => (Message::assistant(response), SubmitOutcome::Answered),
            Err(e) => {
                tracing::error!(error = %e, "Error sending message");
                (Message::synthetic_error(), SubmitOutcome::Failed)
            }
        };

        let spoken = reply.content.clone();
        self.append(reply);
        self.speak(&spoken);
        self.finish_dispatch();

        tracing::info!(outcome = ?outcome, "Query resolved");
        outcome
    }

    // -- Speech input --

    /// Start capturing speech (the microphone button).
    ///
    /// No-op without a usable recognizer, while the controls are disabled or
    /// when already listening.
    pub fn start_listening(&self) -> bool {
        if self.state() != WidgetState::Idle {
            return false;
        }
        match self.input.start() {
            Ok(Some(_)) => {
                if let Err(e) = self.set_state(WidgetState::Listening) {
                    tracing::warn!(error = %e, "Recognition started outside Idle");
                    self.input.stop();
                    return false;
                }
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start speech recognition");
                false
            }
        }
    }

    /// Cancel speech capture. Late results from the cancelled session are
    /// ignored.
    pub fn stop_listening(&self) -> bool {
        let stopped = self.input.stop().is_some();
        let moved = self.move_state(WidgetState::Listening, WidgetState::Idle);
        stopped || moved
    }

    /// Microphone button: stop when listening, start otherwise.
    pub fn toggle_listening(&self) -> bool {
        if self.is_listening() {
            self.stop_listening()
        } else {
            self.start_listening()
        }
    }

    // -- Speech output --

    /// Speak `text`, stopping any capture first and superseding any
    /// utterance still playing. `speaking` turns on when the synthesizer
    /// reports the start of playback.
    pub fn speak(&self, text: &str) -> bool {
        self.stop_listening();
        if self.output.current().is_some() {
            self.move_state(WidgetState::Speaking, WidgetState::Idle);
        }
        match self.output.speak(text) {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Speech synthesis failed");
                false
            }
        }
    }

    /// Cancel playback immediately.
    pub fn stop_speaking(&self) -> bool {
        let cancelled = self.output.cancel().is_some();
        let moved = self.move_state(WidgetState::Speaking, WidgetState::Idle);
        cancelled || moved
    }

    // -- Speech events --

    /// Apply one event reported by a speech engine.
    pub async fn handle_speech_event(&self, event: SpeechEvent) {
        match event {
            SpeechEvent::RecognitionResult { session, .. } => {
                if !self.input.finish(session) {
                    return;
                }
                self.move_state(WidgetState::Listening, WidgetState::Idle);
                let transcript = event.best_transcript().unwrap_or_default().to_string();
                tracing::info!(session = %session, chars = transcript.chars().count(), "Speech recognized");
                self.write_pending_input(transcript.clone());
                if !transcript.trim().is_empty() {
                    self.submit_query(&transcript).await;
                }
            }
            SpeechEvent::RecognitionError { session, code } => {
                if !self.input.finish(session) {
                    return;
                }
                self.move_state(WidgetState::Listening, WidgetState::Idle);
                tracing::error!(session = %session, code = %code, "Speech recognition error");
                self.emit(WidgetEvent::SpeechError { code });
            }
            SpeechEvent::RecognitionEnded { session } => {
                if self.input.finish(session) {
                    self.move_state(WidgetState::Listening, WidgetState::Idle);
                }
            }
            SpeechEvent::UtteranceStarted { utterance } => {
                if !self.output.is_current(utterance) {
                    return;
                }
                self.stop_listening();
                match self.state() {
                    WidgetState::Idle => {
                        self.move_state(WidgetState::Idle, WidgetState::Speaking);
                    }
                    WidgetState::Dispatching => {
                        self.move_state(WidgetState::Dispatching, WidgetState::Speaking);
                    }
                    WidgetState::Speaking | WidgetState::Listening => {}
                }
            }
            SpeechEvent::UtteranceEnded { utterance } => {
                if self.output.finish(utterance) {
                    self.move_state(WidgetState::Speaking, WidgetState::Idle);
                }
            }
            SpeechEvent::UtteranceError { utterance, code } => {
                if self.output.finish(utterance) {
                    tracing::warn!(utterance = %utterance, code = %code, "Speech synthesis error");
                    self.move_state(WidgetState::Speaking, WidgetState::Idle);
                }
            }
        }
    }

    /// Handle every speech event already queued, without waiting for more.
    /// Returns how many were handled.
    pub async fn pump_events(&self) -> usize {
        let mut handled = 0;
        loop {
            let event = {
                let mut rx = self.speech_rx.lock().await;
                match rx.try_recv() {
                    Ok(event) => event,
                    Err(_) => break,
                }
            };
            self.handle_speech_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Handle speech events as they arrive. Runs for the widget's lifetime.
    pub async fn run_events(&self) {
        loop {
            let event = {
                let mut rx = self.speech_rx.lock().await;
                rx.recv().await
            };
            match event {
                Some(event) => self.handle_speech_event(event).await,
                None => break,
            }
        }
    }

    // -- Private helpers --

    fn input_engine(&self) -> Option<Arc<dyn SpeechInput>> {
        self.input.engine()
    }

    fn lock_conversation(&self) -> std::sync::MutexGuard<'_, Conversation> {
        self.conversation
            .lock()
            .expect("conversation mutex poisoned")
    }

    /// Preempt capture or playback, append the user message, clear the draft
    /// and enter `Dispatching`.
    fn begin_dispatch(&self, text: &str) {
        self.stop_listening();
        self.stop_speaking();

        self.append(Message::user(text));
        self.write_pending_input(String::new());

        if let Err(e) = self.set_state(WidgetState::Dispatching) {
            tracing::warn!(error = %e, "Recovering widget state before dispatch");
            self.machine.reset();
            if let Err(e) = self.set_state(WidgetState::Dispatching) {
                tracing::error!(error = %e, "Failed to enter Dispatching");
            }
        }
    }

    /// Leave `Dispatching` unless playback already took over.
    fn finish_dispatch(&self) {
        self.move_state(WidgetState::Dispatching, WidgetState::Idle);
    }

    fn append(&self, message: Message) -> usize {
        let index = self.lock_conversation().append(message.clone());
        self.emit(WidgetEvent::MessageAppended { index, message });
        index
    }

    fn write_pending_input(&self, text: String) {
        {
            let mut conversation = self.lock_conversation();
            if conversation.pending_input() == text {
                return;
            }
            conversation.set_pending_input(text.clone());
        }
        self.emit(WidgetEvent::PendingInputChanged { text });
    }

    fn set_state(&self, target: WidgetState) -> Result<(), PdfChatError> {
        let from = self.machine.transition(target)?;
        self.emit(WidgetEvent::StateChanged { from, to: target });
        Ok(())
    }

    /// Transition `from -> to` only when currently in `from`.
    fn move_state(&self, from: WidgetState, to: WidgetState) -> bool {
        match self.machine.transition_from(from, to) {
            Ok(true) => {
                self.emit(WidgetEvent::StateChanged { from, to });
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected widget state transition");
                false
            }
        }
    }

    fn emit(&self, event: WidgetEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use async_trait::async_trait;
    use pdfchat_core::{Role, SYNTHETIC_ERROR_MESSAGE};
    use pdfchat_speech::mock::{MockSpeechInput, MockSpeechOutput};
    use std::collections::VecDeque;

    /// Query client returning scripted replies and recording every query.
    #[derive(Default)]
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String, DispatchError>>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn with(replies: Vec<Result<String, DispatchError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryClient for ScriptedClient {
        async fn query(&self, query: &str) -> Result<String, DispatchError> {
            self.queries.lock().unwrap().push(query.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(DispatchError::Transport("no scripted reply".into())))
        }
    }

    struct Harness {
        widget: ChatWidget,
        client: Arc<ScriptedClient>,
        input: Arc<MockSpeechInput>,
        output: Arc<MockSpeechOutput>,
    }

    fn harness(replies: Vec<Result<String, DispatchError>>) -> Harness {
        let client = ScriptedClient::with(replies);
        let input = Arc::new(MockSpeechInput::new());
        let output = Arc::new(MockSpeechOutput::new());
        let widget = ChatWidget::new(client.clone())
            .with_speech_input(input.clone())
            .with_speech_output(output.clone());
        Harness {
            widget,
            client,
            input,
            output,
        }
    }

    fn ok(text: &str) -> Result<String, DispatchError> {
        Ok(text.to_string())
    }

    // ---- Construction ----

    #[test]
    fn test_new_widget_is_idle_and_empty() {
        let widget = ChatWidget::new(ScriptedClient::with(vec![]));
        assert_eq!(widget.state(), WidgetState::Idle);
        assert!(widget.messages().is_empty());
        assert_eq!(widget.pending_input(), "");
        assert!(widget.controls_enabled());
        assert!(!widget.speech_input_available());
        assert!(!widget.speech_output_available());
    }

    #[test]
    fn test_from_config_respects_enabled_flags() {
        let mut config = PdfChatConfig::default();
        config.speech.input_enabled = false;
        let widget = ChatWidget::from_config(
            &config,
            ScriptedClient::with(vec![]),
            Some(Arc::new(MockSpeechInput::new())),
            Some(Arc::new(MockSpeechOutput::new())),
        );
        assert!(!widget.speech_input_available());
        assert!(widget.speech_output_available());
    }

    // ---- Dispatch ----

    #[tokio::test]
    async fn test_successful_query_appends_reply_and_speaks_it() {
        let h = harness(vec![ok("Refunds are processed within 30 days.")]);

        let outcome = h.widget.submit_query("What is the refund policy?").await;
        assert_eq!(outcome, SubmitOutcome::Answered);

        let messages = h.widget.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "What is the refund policy?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Refunds are processed within 30 days.");
        assert_eq!(h.client.queries(), vec!["What is the refund policy?"]);
        assert_eq!(
            h.output.spoken(),
            vec!["Refunds are processed within 30 days."]
        );
        assert!(!h.widget.is_busy());
    }

    #[tokio::test]
    async fn test_failed_query_appends_synthetic_message() {
        let h = harness(vec![Err(DispatchError::Transport("connection refused".into()))]);

        let outcome = h.widget.submit_query("Hello").await;
        assert_eq!(outcome, SubmitOutcome::Failed);

        let last = h.widget.messages().last().cloned().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, SYNTHETIC_ERROR_MESSAGE);
        assert_eq!(h.output.spoken(), vec![SYNTHETIC_ERROR_MESSAGE]);
        assert!(!h.widget.is_busy());
    }

    #[tokio::test]
    async fn test_every_failure_kind_yields_same_message() {
        let h = harness(vec![
            Err(DispatchError::Status(500)),
            Err(DispatchError::MalformedBody("eof".into())),
            Err(DispatchError::MissingResponse),
        ]);
        for query in ["a", "b", "c"] {
            assert_eq!(h.widget.submit_query(query).await, SubmitOutcome::Failed);
        }
        let messages = h.widget.messages();
        assert_eq!(messages.len(), 6);
        for pair in messages.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert!(pair[1].is_synthetic_error());
        }
    }

    #[tokio::test]
    async fn test_blank_query_is_ignored() {
        let h = harness(vec![ok("unused")]);
        h.widget.set_pending_input("   ");

        for blank in ["", "   ", "\n\t"] {
            assert_eq!(h.widget.submit_query(blank).await, SubmitOutcome::Ignored);
        }
        assert!(h.widget.messages().is_empty());
        assert!(h.client.queries().is_empty());
        assert_eq!(h.widget.pending_input(), "   ");
        assert_eq!(h.widget.state(), WidgetState::Idle);
    }

    #[tokio::test]
    async fn test_query_content_is_kept_untrimmed() {
        let h = harness(vec![ok("ok")]);
        h.widget.submit_query("  Hello  ").await;
        assert_eq!(h.widget.messages()[0].content, "  Hello  ");
        assert_eq!(h.client.queries(), vec!["  Hello  "]);
    }

    #[tokio::test]
    async fn test_submit_pending_clears_draft() {
        let h = harness(vec![ok("It is on page 4.")]);
        assert!(h.widget.set_pending_input("Where is the warranty?"));

        assert_eq!(h.widget.submit_pending().await, SubmitOutcome::Answered);
        assert_eq!(h.widget.pending_input(), "");
        assert_eq!(h.widget.messages()[0].content, "Where is the warranty?");
    }

    #[tokio::test]
    async fn test_busy_only_while_dispatching() {
        struct ObservingClient {
            widget_state: Mutex<Option<(bool, usize, String)>>,
            probe: Mutex<Option<Arc<ChatWidget>>>,
        }

        #[async_trait]
        impl QueryClient for ObservingClient {
            async fn query(&self, _query: &str) -> Result<String, DispatchError> {
                let widget = self.probe.lock().unwrap().clone().unwrap();
                *self.widget_state.lock().unwrap() = Some((
                    widget.is_busy(),
                    widget.messages().len(),
                    widget.pending_input(),
                ));
                Ok("done".to_string())
            }
        }

        let client = Arc::new(ObservingClient {
            widget_state: Mutex::new(None),
            probe: Mutex::new(None),
        });
        let widget = Arc::new(ChatWidget::new(client.clone()));
        *client.probe.lock().unwrap() = Some(widget.clone());

        widget.set_pending_input("draft");
        assert!(!widget.is_busy());
        widget.submit_pending().await;
        assert!(!widget.is_busy());

        let (busy, messages, pending) = client.widget_state.lock().unwrap().clone().unwrap();
        assert!(busy, "busy must be set before the request is issued");
        assert_eq!(messages, 1, "user message must be appended before the request");
        assert_eq!(pending, "", "draft must be cleared before the request");

        // Break the Arc cycle.
        client.probe.lock().unwrap().take();
    }

    #[tokio::test]
    async fn test_controls_disabled_while_dispatching() {
        /// Tries every input control while its own request is in flight.
        struct ReentrantClient {
            widget: Mutex<Option<Arc<ChatWidget>>>,
            attempts: Mutex<Option<(bool, bool, SubmitOutcome)>>,
        }

        #[async_trait]
        impl QueryClient for ReentrantClient {
            async fn query(&self, _query: &str) -> Result<String, DispatchError> {
                let widget = self.widget.lock().unwrap().clone().unwrap();
                let edited = widget.set_pending_input("x");
                let listening = widget.start_listening();
                let submitted = widget.submit_pending().await;
                *self.attempts.lock().unwrap() = Some((edited, listening, submitted));
                Ok("answer".to_string())
            }
        }

        let client = Arc::new(ReentrantClient {
            widget: Mutex::new(None),
            attempts: Mutex::new(None),
        });
        let input = Arc::new(MockSpeechInput::new());
        let widget = Arc::new(ChatWidget::new(client.clone()).with_speech_input(input.clone()));
        *client.widget.lock().unwrap() = Some(widget.clone());

        assert_eq!(widget.submit_query("question").await, SubmitOutcome::Answered);

        let attempts = client.attempts.lock().unwrap().take().unwrap();
        assert_eq!(attempts, (false, false, SubmitOutcome::Ignored));
        assert!(input.started_sessions().is_empty());
        assert_eq!(widget.pending_input(), "");
        assert_eq!(widget.messages().len(), 2);

        client.widget.lock().unwrap().take();
    }

    #[tokio::test]
    async fn test_snapshot_reflects_log_draft_and_flags() {
        let h = harness(vec![ok("Refunds are processed within 30 days.")]);
        h.widget.set_pending_input("draft");

        let snapshot = h.widget.snapshot();
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.pending_input, "draft");
        assert!(!snapshot.busy && !snapshot.listening && !snapshot.speaking);
        assert!(snapshot.controls_enabled());

        h.widget.submit_query("What is the refund policy?").await;
        h.widget.pump_events().await;

        let snapshot = h.widget.snapshot();
        assert_eq!(snapshot.messages, h.widget.messages());
        assert_eq!(snapshot.pending_input, "");
        assert!(snapshot.speaking);
        assert!(!snapshot.busy);
        assert!(!snapshot.controls_enabled());
    }

    #[tokio::test]
    async fn test_overlapping_submissions_are_serialized() {
        let h = harness(vec![ok("first answer"), ok("second answer")]);

        let (a, b) = tokio::join!(
            h.widget.submit_query("first"),
            h.widget.submit_query("second")
        );
        assert_eq!(a, SubmitOutcome::Answered);
        assert_eq!(b, SubmitOutcome::Answered);

        let contents: Vec<String> = h.widget.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(
            contents,
            vec!["first", "first answer", "second", "second answer"]
        );
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let h = harness(vec![ok("Refunds are processed within 30 days.")]);
        let mut rx = h.widget.subscribe();

        h.widget.submit_query("What is the refund policy?").await;

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind());
        }
        assert_eq!(
            kinds,
            vec![
                "message_appended",
                "state_changed",
                "message_appended",
                "state_changed",
            ]
        );
    }

    // ---- Speech input ----

    #[tokio::test]
    async fn test_transcript_is_submitted_automatically() {
        let h = harness(vec![ok("Page two covers refunds.")]);
        let mut rx = h.widget.subscribe();

        assert!(h.widget.start_listening());
        assert!(h.widget.is_listening());
        assert!(h.input.emit_result("summarize page two"));

        h.widget.pump_events().await;

        assert_eq!(h.client.queries(), vec!["summarize page two"]);
        let messages = h.widget.messages();
        assert_eq!(messages[0].content, "summarize page two");
        assert_eq!(messages[1].content, "Page two covers refunds.");
        assert_eq!(h.widget.pending_input(), "");

        // The transcript went through the draft before being submitted.
        let mut saw_transcript = false;
        while let Ok(event) = rx.try_recv() {
            if event
                == (WidgetEvent::PendingInputChanged {
                    text: "summarize page two".to_string(),
                })
            {
                saw_transcript = true;
            }
        }
        assert!(saw_transcript);
    }

    #[tokio::test]
    async fn test_blank_transcript_fills_draft_without_submitting() {
        let h = harness(vec![]);
        h.widget.start_listening();
        h.input.emit_result("   ");
        h.widget.pump_events().await;

        assert_eq!(h.widget.pending_input(), "   ");
        assert!(h.client.queries().is_empty());
        assert_eq!(h.widget.state(), WidgetState::Idle);
    }

    #[tokio::test]
    async fn test_recognition_error_returns_to_idle_silently() {
        let h = harness(vec![]);
        let mut rx = h.widget.subscribe();
        h.widget.start_listening();
        h.input.emit_error("no-speech");
        h.widget.pump_events().await;

        assert_eq!(h.widget.state(), WidgetState::Idle);
        assert!(h.widget.messages().is_empty());
        assert_eq!(h.input.started_sessions().len(), 1);

        let mut codes = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let WidgetEvent::SpeechError { code } = event {
                codes.push(code);
            }
        }
        assert_eq!(codes, vec!["no-speech"]);
    }

    #[tokio::test]
    async fn test_recognition_end_without_result_returns_to_idle() {
        let h = harness(vec![]);
        h.widget.start_listening();
        h.input.emit_end();
        h.widget.pump_events().await;
        assert_eq!(h.widget.state(), WidgetState::Idle);
    }

    #[tokio::test]
    async fn test_result_after_stop_is_ignored() {
        let h = harness(vec![ok("unused")]);
        h.widget.start_listening();
        let session = h.input.active_session().unwrap();
        assert!(h.widget.stop_listening());
        assert!(!h.widget.is_listening());

        h.input.emit_raw(SpeechEvent::RecognitionResult {
            session,
            alternatives: vec![pdfchat_speech::RecognitionAlternative::new("late words")],
        });
        h.widget.pump_events().await;

        assert!(h.client.queries().is_empty());
        assert_eq!(h.widget.pending_input(), "");
    }

    #[tokio::test]
    async fn test_toggle_listening() {
        let h = harness(vec![]);
        assert!(h.widget.toggle_listening());
        assert!(h.widget.is_listening());
        assert!(h.widget.toggle_listening());
        assert!(!h.widget.is_listening());
        assert_eq!(h.input.stopped_sessions().len(), 1);
    }

    #[test]
    fn test_start_listening_without_recognizer_is_noop() {
        let widget = ChatWidget::new(ScriptedClient::with(vec![]))
            .with_speech_input(Arc::new(MockSpeechInput::unavailable()));
        assert!(!widget.start_listening());
        assert_eq!(widget.state(), WidgetState::Idle);
    }

    #[tokio::test]
    async fn test_microphone_disabled_while_speaking() {
        let h = harness(vec![]);
        h.widget.speak("reading the answer");
        h.widget.pump_events().await;
        assert!(h.widget.is_speaking());

        assert!(!h.widget.start_listening());
        assert!(!h.widget.set_pending_input("typed"));
        assert_eq!(h.widget.submit_pending().await, SubmitOutcome::Ignored);
        assert!(h.input.started_sessions().is_empty());
    }

    #[tokio::test]
    async fn test_typed_submit_while_listening_cancels_capture() {
        let h = harness(vec![ok("ok")]);
        h.widget.start_listening();
        h.widget.set_pending_input("typed instead");

        h.widget.submit_pending().await;
        assert_eq!(h.input.stopped_sessions().len(), 1);
        assert_eq!(h.widget.messages()[0].content, "typed instead");
    }

    // ---- Speech output ----

    #[tokio::test]
    async fn test_speak_stops_listening_before_playback() {
        let h = harness(vec![]);
        h.widget.start_listening();
        assert!(h.widget.is_listening());

        assert!(h.widget.speak("Hello"));
        assert!(!h.widget.is_listening());
        assert_eq!(h.input.stopped_sessions().len(), 1);

        h.widget.pump_events().await;
        assert!(h.widget.is_speaking());
    }

    #[tokio::test]
    async fn test_natural_completion_clears_speaking() {
        let h = harness(vec![]);
        h.widget.speak("Hello");
        h.widget.pump_events().await;
        assert!(h.widget.is_speaking());

        assert!(h.output.complete());
        h.widget.pump_events().await;
        assert!(!h.widget.is_speaking());
        assert_eq!(h.widget.state(), WidgetState::Idle);
    }

    #[tokio::test]
    async fn test_stop_speaking_is_immediate() {
        let h = harness(vec![]);
        h.widget.speak("A long passage from the document");
        h.widget.pump_events().await;
        assert!(h.widget.is_speaking());

        assert!(h.widget.stop_speaking());
        assert!(!h.widget.is_speaking());
        assert_eq!(h.output.cancel_count(), 1);
        assert_eq!(h.output.playing(), None);
        assert!(!h.output.complete());
    }

    #[tokio::test]
    async fn test_stale_utterance_events_are_ignored() {
        let h = harness(vec![]);
        h.widget.speak("first");
        h.widget.pump_events().await;
        let first = h.output.playing().unwrap();
        h.widget.stop_speaking();

        h.widget
            .handle_speech_event(SpeechEvent::UtteranceStarted { utterance: first })
            .await;
        assert!(!h.widget.is_speaking());

        h.widget.speak("second");
        h.widget.pump_events().await;
        assert!(h.widget.is_speaking());
        h.widget
            .handle_speech_event(SpeechEvent::UtteranceEnded { utterance: first })
            .await;
        assert!(h.widget.is_speaking());
    }

    #[tokio::test]
    async fn test_new_utterance_supersedes_active_one() {
        let h = harness(vec![]);
        h.widget.speak("first");
        h.widget.pump_events().await;
        h.widget.speak("second");
        h.widget.pump_events().await;

        assert!(h.widget.is_speaking());
        assert_eq!(h.output.spoken(), vec!["first", "second"]);
        assert_eq!(h.output.cancel_count(), 1);

        h.output.complete();
        h.widget.pump_events().await;
        assert_eq!(h.widget.state(), WidgetState::Idle);
    }

    #[tokio::test]
    async fn test_speak_without_synthesizer_is_noop() {
        let client = ScriptedClient::with(vec![ok("answer")]);
        let widget = ChatWidget::new(client);
        assert!(!widget.speak("Hello"));

        assert_eq!(widget.submit_query("question").await, SubmitOutcome::Answered);
        widget.pump_events().await;
        assert_eq!(widget.state(), WidgetState::Idle);
        assert_eq!(widget.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_reply_playback_starts_after_dispatch() {
        let h = harness(vec![ok("Refunds are processed within 30 days.")]);
        h.widget.submit_query("What is the refund policy?").await;
        assert_eq!(h.widget.state(), WidgetState::Idle);

        h.widget.pump_events().await;
        assert!(h.widget.is_speaking());
        assert!(!h.widget.controls_enabled());
    }

    #[tokio::test]
    async fn test_playback_started_during_dispatch_clears_busy() {
        let h = harness(vec![]);
        h.widget.speak("queued");
        let utterance = h.output.playing().unwrap();

        h.widget.stop_speaking();
        h.widget.speak("queued again");
        let current = h.output.playing().unwrap();
        assert_ne!(utterance, current);

        h.widget.machine.transition(WidgetState::Dispatching).unwrap();
        h.widget
            .handle_speech_event(SpeechEvent::UtteranceStarted { utterance: current })
            .await;
        assert_eq!(h.widget.state(), WidgetState::Speaking);
        assert!(!h.widget.is_busy());

        h.widget.finish_dispatch();
        assert_eq!(h.widget.state(), WidgetState::Speaking);
    }
}
