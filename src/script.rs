//! YAML session scripts: a page fixture, extra frame documents and the
//! user steps to replay against them.
//!
//! ```yaml
//! page:
//!   url: https://shop.example/cart
//!   html: <html><body><button id="buy">Buy</button></body></html>
//! steps:
//!   - do: start
//!   - do: click
//!     target: //button[@id="buy"]
//!   - do: stop
//! ```

use action_recorder::AssertionType;
use serde::Deserialize;

use crate::errors::ScriptError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionScript {
    pub page: PageFixture,
    /// Documents loaded into iframes that carry no `srcdoc`, in order.
    #[serde(default)]
    pub frames: Vec<FrameFixture>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl SessionScript {
    pub fn from_yaml(source: &str) -> Result<Self, ScriptError> {
        Ok(serde_yaml::from_str(source)?)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageFixture {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameFixture {
    /// The `<iframe>` element receiving the document.
    pub frame: TargetRef,
    pub url: String,
    pub html: String,
}

/// An element addressed from the top document: an optional iframe chain,
/// an optional shadow-host chain, then an XPath in the innermost scope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TargetRef {
    XPath(String),
    Scoped(ScopedTarget),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScopedTarget {
    #[serde(default)]
    pub frames: Vec<String>,
    #[serde(default)]
    pub shadow: Vec<String>,
    pub xpath: String,
}

impl TargetRef {
    pub fn frames(&self) -> &[String] {
        match self {
            TargetRef::XPath(_) => &[],
            TargetRef::Scoped(scoped) => &scoped.frames,
        }
    }

    pub fn shadow_hosts(&self) -> &[String] {
        match self {
            TargetRef::XPath(_) => &[],
            TargetRef::Scoped(scoped) => &scoped.shadow,
        }
    }

    pub fn xpath(&self) -> &str {
        match self {
            TargetRef::XPath(xpath) => xpath,
            TargetRef::Scoped(scoped) => &scoped.xpath,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "do", rename_all = "snake_case")]
pub enum Step {
    Start,
    Stop,
    Assert {
        #[serde(rename = "type", default)]
        assertion_type: Option<AssertionType>,
    },
    CancelAssert,
    Status,
    Click {
        target: TargetRef,
    },
    /// Types `text` one character at a time, firing `input` per keystroke.
    Type {
        target: TargetRef,
        text: String,
    },
    /// Presses `key` on `target`, or on the focused element.
    Key {
        #[serde(default)]
        target: Option<TargetRef>,
        key: String,
    },
    Blur,
    /// Clicks a checkbox or radio; `checked` forces the resulting state.
    Check {
        target: TargetRef,
        #[serde(default)]
        checked: Option<bool>,
    },
    Select {
        target: TargetRef,
        value: String,
    },
    Wait {
        ms: u64,
    },
    /// Appends an HTML fragment under `target`.
    Insert {
        target: TargetRef,
        html: String,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Start => "start",
            Step::Stop => "stop",
            Step::Assert { .. } => "assert",
            Step::CancelAssert => "cancel_assert",
            Step::Status => "status",
            Step::Click { .. } => "click",
            Step::Type { .. } => "type",
            Step::Key { .. } => "key",
            Step::Blur => "blur",
            Step::Check { .. } => "check",
            Step::Select { .. } => "select",
            Step::Wait { .. } => "wait",
            Step::Insert { .. } => "insert",
        }
    }

    /// Steps that consume virtual time before they run.
    pub fn is_interaction(&self) -> bool {
        !matches!(self, Step::Wait { .. } | Step::Status)
    }
}
