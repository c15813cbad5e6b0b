use action_locator::LocatorError;
use perceiver_context::ContextError;
use soulrecorder_dom::DomError;
use thiserror::Error;

use crate::state::RecorderState;

#[derive(Debug, Error, Clone)]
pub enum RecorderError {
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: RecorderState,
        to: RecorderState,
    },
    #[error("recording has not been started")]
    NotRecording,
    #[error("recording already in progress")]
    AlreadyRecording,
    #[error("recording is sealed")]
    Sealed,
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Delivery failure towards the coordinating process.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("receiver unavailable: {0}")]
    Unavailable(String),
}
