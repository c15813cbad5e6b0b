//! JSON shape exchanged with the coordinating process and consumed by
//! the exporters.

use perceiver_context::{FrameDescriptor, ShadowHostDescriptor};
use serde::{Deserialize, Serialize};

use crate::model::{Action, ActionKind, AssertionType, ElementSnapshot, ValuePayload};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Primary locator; `null` when no unique expression exists.
    pub xpath: Option<String>,
    #[serde(rename = "fullXPath")]
    pub full_xpath: String,
    pub element: ElementSnapshot,
    pub iframe: Option<Vec<FrameDescriptor>>,
    pub frame_index: Option<usize>,
    pub shadow: Option<Vec<ShadowHostDescriptor>>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_type: Option<AssertionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub timestamp: u64,
}

impl From<&Action> for WireAction {
    fn from(action: &Action) -> Self {
        let mut wire = WireAction {
            kind: action.kind,
            xpath: action.locator.primary.clone(),
            full_xpath: action.locator.full_path.clone(),
            element: action.element.clone(),
            iframe: (!action.frame_context.is_empty()).then(|| action.frame_context.clone()),
            frame_index: action
                .frame_context
                .last()
                .and_then(|frame| frame.ordinal_index),
            shadow: (!action.shadow_context.is_empty()).then(|| action.shadow_context.clone()),
            description: action.description.clone(),
            value: None,
            label: None,
            key: None,
            checked: None,
            assertion_type: None,
            expected_value: None,
            url: None,
            timestamp: action.timestamp,
        };
        match &action.payload {
            ValuePayload::None => {}
            ValuePayload::Text { value } => wire.value = Some(value.clone()),
            ValuePayload::Selected { value, label } => {
                wire.value = Some(value.clone());
                wire.label = Some(label.clone());
            }
            ValuePayload::Checked { checked } => wire.checked = Some(*checked),
            ValuePayload::Key { key } => wire.key = Some(key.clone()),
            ValuePayload::Assertion {
                assertion_type,
                expected_value,
            } => {
                wire.assertion_type = Some(*assertion_type);
                wire.expected_value = expected_value.clone();
            }
            ValuePayload::Page { url } => wire.url = Some(url.clone()),
        }
        wire
    }
}

impl From<Action> for WireAction {
    fn from(action: Action) -> Self {
        WireAction::from(&action)
    }
}
