use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("html parse error: {0}")]
    HtmlParse(String),

    /// Reading another window's document across an origin boundary.
    #[error("blocked a frame with origin {child} from accessing origin {parent}")]
    CrossOrigin { child: String, parent: String },

    #[error("invalid node: {0}")]
    InvalidNode(String),

    #[error("invalid xpath '{expr}': {reason}")]
    XPath { expr: String, reason: String },

    #[error("shadow root already attached to <{0}>")]
    ShadowAlreadyAttached(String),
}

impl DomError {
    pub fn xpath(expr: &str, reason: impl Into<String>) -> Self {
        Self::XPath {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_cross_origin(&self) -> bool {
        matches!(self, DomError::CrossOrigin { .. })
    }
}
