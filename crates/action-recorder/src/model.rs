use std::fmt;
use std::str::FromStr;

use action_locator::LocatorPair;
use chrono::{DateTime, TimeZone, Utc};
use perceiver_context::{FrameDescriptor, ShadowHostDescriptor};
use serde::{Deserialize, Serialize};
use soulrecorder_core_types::{ActionId, RecordingId};
use soulrecorder_dom::{normalize_space, NodeId, Page};

use crate::errors::RecorderError;
use crate::value::recorded_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Click,
    Input,
    Select,
    Check,
    Keypress,
    Assertion,
    PageMarker,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Input => "input",
            ActionKind::Select => "select",
            ActionKind::Check => "check",
            ActionKind::Keypress => "keypress",
            ActionKind::Assertion => "assertion",
            ActionKind::PageMarker => "page-marker",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionType {
    /// The element exists.
    Element,
    /// The element's text matches.
    Text,
}

impl FromStr for AssertionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "element" | "exists" => Ok(AssertionType::Element),
            "text" => Ok(AssertionType::Text),
            other => Err(format!("unknown assertion type '{other}'")),
        }
    }
}

/// Element state at capture time. Never updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    pub tag: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class_list: Vec<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    pub visible: bool,
    pub in_shadow_dom: bool,
    pub in_iframe: bool,
}

impl ElementSnapshot {
    pub fn capture(page: &Page, element: NodeId, text_limit: usize) -> Self {
        let attr = |name: &str| page.attr(element, name).map(str::to_string);
        let text: String = normalize_space(&page.text_content(element))
            .chars()
            .take(text_limit)
            .collect();
        let in_iframe = page
            .window_of(element)
            .map(|window| !page.is_top(window))
            .unwrap_or(false);
        Self {
            tag: page.tag(element).unwrap_or_default().to_string(),
            input_type: attr("type"),
            id: attr("id"),
            name: attr("name"),
            class_list: page
                .attr(element, "class")
                .map(|classes| classes.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            text,
            placeholder: attr("placeholder"),
            value: recorded_value(page, element),
            href: attr("href"),
            role: attr("role"),
            aria_label: attr("aria-label"),
            visible: page.is_visible(element),
            in_shadow_dom: page.is_shadow_root(page.root_node(element)),
            in_iframe,
        }
    }
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "payload", rename_all = "kebab-case")]
pub enum ValuePayload {
    None,
    /// Final text of an input; masked for password fields.
    Text { value: String },
    Selected { value: String, label: String },
    Checked { checked: bool },
    Key { key: String },
    Assertion {
        assertion_type: AssertionType,
        expected_value: Option<String>,
    },
    Page { url: String },
}

/// One recorded interaction or assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: ActionId,
    pub kind: ActionKind,
    pub locator: LocatorPair,
    pub element: ElementSnapshot,
    pub frame_context: Vec<FrameDescriptor>,
    pub shadow_context: Vec<ShadowHostDescriptor>,
    pub payload: ValuePayload,
    pub description: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Action {
    /// Key used for duplicate suppression.
    pub fn dedup_key(&self) -> (ActionKind, &str) {
        (self.kind, self.locator.preferred())
    }
}

/// Append-only action list for one session. Sealed when recording stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: RecordingId,
    pub source_url: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    actions: Vec<Action>,
}

impl Recording {
    pub fn start(source_url: impl Into<String>, started_at_ms: u64) -> Self {
        Self {
            id: RecordingId::new(),
            source_url: source_url.into(),
            started_at: instant(started_at_ms),
            ended_at: None,
            actions: Vec::new(),
        }
    }

    pub fn append(&mut self, action: Action) -> Result<(), RecorderError> {
        if self.is_sealed() {
            return Err(RecorderError::Sealed);
        }
        self.actions.push(action);
        Ok(())
    }

    pub fn seal(&mut self, ended_at_ms: u64) {
        if self.ended_at.is_none() {
            self.ended_at = Some(instant(ended_at_ms));
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

fn instant(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_default()
}
