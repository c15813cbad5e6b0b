//! Recorder state machine.
//!
//! - Idle -> Recording (start)
//! - Recording -> AssertionPending (enter assertion mode)
//! - AssertionPending -> Recording (assertion captured, or cancel)
//! - Recording -> Idle (stop)
//! - AssertionPending -> Idle (stop while waiting for an assertion)

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::RecorderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    /// Not capturing. No listeners attached.
    Idle,
    /// Capturing user interactions.
    Recording,
    /// Capturing; the next click becomes an assertion.
    AssertionPending,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderState::Idle => write!(f, "Idle"),
            RecorderState::Recording => write!(f, "Recording"),
            RecorderState::AssertionPending => write!(f, "AssertionPending"),
        }
    }
}

impl RecorderState {
    pub fn can_transition_to(&self, target: &RecorderState) -> bool {
        matches!(
            (self, target),
            (RecorderState::Idle, RecorderState::Recording)
                | (RecorderState::Recording, RecorderState::AssertionPending)
                | (RecorderState::AssertionPending, RecorderState::Recording)
                | (RecorderState::Recording, RecorderState::Idle)
                | (RecorderState::AssertionPending, RecorderState::Idle)
        )
    }

    /// Recording, including the assertion sub-state.
    pub fn is_active(&self) -> bool {
        !matches!(self, RecorderState::Idle)
    }
}

/// Owned by one recorder; a fresh machine starts every session in `Idle`.
#[derive(Debug, Default)]
pub struct StateMachine {
    state: RecorderState,
}

impl Default for RecorderState {
    fn default() -> Self {
        RecorderState::Idle
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> RecorderState {
        self.state
    }

    pub fn transition(&mut self, target: RecorderState) -> Result<(), RecorderError> {
        if self.state.can_transition_to(&target) {
            debug!(target: "action_recorder", "recorder state: {} -> {}", self.state, target);
            self.state = target;
            Ok(())
        } else {
            Err(RecorderError::InvalidTransition {
                from: self.state,
                to: target,
            })
        }
    }
}
