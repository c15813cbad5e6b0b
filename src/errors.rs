//! Errors raised while loading and driving a session script

use action_locator::LocatorError;
use action_recorder::RecorderError;
use perceiver_context::ContextError;
use soulrecorder_dom::DomError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("invalid script: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("target '{xpath}' matched {count} nodes, expected exactly one")]
    Target { xpath: String, count: usize },

    #[error("'{0}' is not a frame with a loaded document")]
    NotAFrame(String),

    #[error("'{0}' does not host a shadow root")]
    NoShadowRoot(String),

    #[error("step {index} ({step}) needs a focused or explicit target")]
    NoTarget { index: usize, step: &'static str },

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),
}
