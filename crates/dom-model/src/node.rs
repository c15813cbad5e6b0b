use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub(crate) usize);

impl WindowId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowRootMode {
    Open,
    Closed,
}

impl ShadowRootMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShadowRootMode::Open => "open",
            ShadowRootMode::Closed => "closed",
        }
    }
}

impl FromStr for ShadowRootMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(ShadowRootMode::Open),
            "closed" => Ok(ShadowRootMode::Closed),
            other => Err(format!("unknown shadow root mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub(crate) tag: String,
    pub(crate) attrs: Vec<(String, String)>,
    /// Live `value` property; `None` until something sets it.
    pub(crate) value: Option<String>,
    pub(crate) checked: bool,
    pub(crate) shadow_root: Option<NodeId>,
    pub(crate) content_window: Option<WindowId>,
}

impl ElementData {
    pub(crate) fn new(tag: &str, attrs: Vec<(String, String)>) -> Self {
        let tag = tag.to_ascii_lowercase();
        let lookup = |name: &str| {
            attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };
        let value = match tag.as_str() {
            "input" => Some(lookup("value").unwrap_or_default()),
            "textarea" => Some(String::new()),
            _ => None,
        };
        let checked = tag == "input" && lookup("checked").is_some();
        Self {
            tag,
            attrs,
            value,
            checked,
            shadow_root: None,
            content_window: None,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub(crate) fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }

    pub fn is_custom_element(&self) -> bool {
        self.tag.contains('-')
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document { window: WindowId },
    ShadowRoot { host: NodeId, mode: ShadowRootMode },
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}
