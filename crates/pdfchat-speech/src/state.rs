//! Widget state machine with thread-safe transitions.
//!
//! Enforces the transition table of [`WidgetState`]; see its documentation
//! for the allowed moves.

use std::sync::{Arc, Mutex};

use pdfchat_core::error::PdfChatError;
use pdfchat_core::WidgetState;

/// Thread-safe state machine for widget state transitions.
///
/// Wraps `WidgetState` in an `Arc<Mutex<>>`. All transitions are validated
/// before being applied, returning an error if the requested transition is
/// not permitted.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<WidgetState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(WidgetState::Idle)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> WidgetState {
        *self.state.lock().expect("state mutex poisoned")
    }

    /// Attempt to transition to the target state.
    ///
    /// Returns the previous state on success, or `PdfChatError::State` if the
    /// transition is not allowed from the current state.
    pub fn transition(&self, target: WidgetState) -> Result<WidgetState, PdfChatError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Widget state: {} -> {}", *state, target);
            let previous = *state;
            *state = target;
            Ok(previous)
        } else {
            Err(PdfChatError::State {
                from: state.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Transition only if the machine is currently in `expected`.
    ///
    /// Returns `Ok(false)` without touching the state when it is not.
    pub fn transition_from(
        &self,
        expected: WidgetState,
        target: WidgetState,
    ) -> Result<bool, PdfChatError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if *state != expected {
            return Ok(false);
        }
        if !state.can_transition_to(&target) {
            return Err(PdfChatError::State {
                from: state.to_string(),
                to: target.to_string(),
            });
        }
        tracing::debug!("Widget state: {} -> {}", *state, target);
        *state = target;
        Ok(true)
    }

    /// Force the state machine back to Idle (used for error recovery).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if *state != WidgetState::Idle {
            tracing::warn!("Widget state machine reset to Idle from {}", *state);
        }
        *state = WidgetState::Idle;
    }
}
