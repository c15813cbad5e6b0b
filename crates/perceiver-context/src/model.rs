use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use soulrecorder_dom::ShadowRootMode;

pub const CLOSED_SHADOW_NOTE: &str =
    "closed shadow root: automation tooling cannot pierce it, manual intervention required";

/// One iframe in an ancestry chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDescriptor {
    /// Preferred locator of the frame element inside its parent document.
    pub locator: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub src: Option<String>,
    /// Position among the parent document's `iframe`/`frame` elements.
    pub ordinal_index: Option<usize>,
    /// Frame boundaries between this frame and the recorded element's own
    /// window; 0 is the innermost frame.
    pub depth: usize,
    pub cross_origin_blocked: bool,
}

impl FrameDescriptor {
    /// Placeholder for a level whose identity cannot be read from inside.
    pub fn blocked(depth: usize) -> Self {
        Self {
            locator: None,
            id: None,
            name: None,
            src: None,
            ordinal_index: None,
            depth,
            cross_origin_blocked: true,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.cross_origin_blocked && self.locator.is_none()
    }
}

/// One shadow host on the way from the document to an element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowHostDescriptor {
    /// Preferred locator of the host within the tree that contains it.
    pub host_locator: String,
    pub host_tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub host_attributes: BTreeMap<String, String>,
    /// Path of the next host (or the element itself) evaluated against this
    /// host's shadow root.
    pub inner_path_within_root: String,
    pub mode: ShadowRootMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
