use serde::{Deserialize, Serialize};
use soulrecorder_dom::NodeId;

/// Keys recorded as keypress actions.
pub const RECORDED_KEYS: &[&str] = &[
    "Enter",
    "Tab",
    "Escape",
    "ArrowUp",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "PageUp",
    "PageDown",
    "Home",
    "End",
];

/// DOM events the recorder listens for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum DomEventKind {
    Click,
    Input,
    Change,
    Keydown { key: String },
    Focusout,
}

impl DomEventKind {
    /// Composed events propagate out of shadow trees, retargeted to the host.
    pub fn is_composed(&self) -> bool {
        !matches!(self, DomEventKind::Change)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomEventKind::Click => "click",
            DomEventKind::Input => "input",
            DomEventKind::Change => "change",
            DomEventKind::Keydown { .. } => "keydown",
            DomEventKind::Focusout => "focusout",
        }
    }
}

/// An event as dispatched by the page, with its original target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: DomEventKind,
    pub target: Option<NodeId>,
}

impl DomEvent {
    pub fn new(kind: DomEventKind, target: NodeId) -> Self {
        Self {
            kind,
            target: Some(target),
        }
    }

    pub fn click(target: NodeId) -> Self {
        Self::new(DomEventKind::Click, target)
    }

    pub fn input(target: NodeId) -> Self {
        Self::new(DomEventKind::Input, target)
    }

    pub fn change(target: NodeId) -> Self {
        Self::new(DomEventKind::Change, target)
    }

    pub fn keydown(target: NodeId, key: impl Into<String>) -> Self {
        Self::new(DomEventKind::Keydown { key: key.into() }, target)
    }

    pub fn focusout(target: NodeId) -> Self {
        Self::new(DomEventKind::Focusout, target)
    }
}

pub fn is_recorded_key(key: &str) -> bool {
    RECORDED_KEYS.contains(&key)
}

/// Finalizes the target's pending input before the key is recorded.
pub fn is_commit_key(key: &str) -> bool {
    matches!(key, "Enter" | "Tab")
}
