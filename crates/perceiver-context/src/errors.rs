use action_locator::LocatorError;
use soulrecorder_dom::DomError;
use thiserror::Error;

/// Cross-origin denial is not an error here; it becomes a sentinel descriptor.
#[derive(Debug, Error, Clone)]
pub enum ContextError {
    #[error("locator synthesis failed: {0}")]
    Locator(#[from] LocatorError),
    #[error("dom access failed: {0}")]
    Dom(#[from] DomError),
}
