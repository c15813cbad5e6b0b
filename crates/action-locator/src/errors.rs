//! Error types for locator synthesis

use soulrecorder_dom::{DomError, NodeId};
use thiserror::Error;

/// Locator error enumeration
///
/// Failing to find a unique locator is not an error: synthesis degrades to
/// the full path. These cover misuse of the API only.
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Locators are only synthesized for elements
    #[error("{0} is not an element")]
    NotAnElement(NodeId),

    /// Expression could not be evaluated
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] DomError),
}
