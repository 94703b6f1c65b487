//! Speech crate - capability interfaces, adapters and the widget state machine.
//!
//! Speech-to-text and text-to-speech engines are injected as trait objects
//! ([`SpeechInput`], [`SpeechOutput`]) and report their lifecycle through
//! [`SpeechEvent`]s on an unbounded channel. The adapters track which
//! recognition session or utterance is current so that late events from a
//! cancelled one are ignored. Thread-safe state is handled via `Arc<Mutex<>>`.

pub mod capability;
pub mod input;
pub mod mock;
pub mod output;
pub mod state;

pub use capability::{
    RecognitionAlternative, RecognitionOptions, SessionId, SpeechEvent, SpeechEventReceiver,
    SpeechEventSender, SpeechInput, SpeechOutput, Utterance, UtteranceId,
};
pub use input::SpeechInputAdapter;
pub use output::SpeechOutputAdapter;
pub use state::StateMachine;
