//! Frame identity resolution
//!
//! From inside a child window the recorder has to find "my iframe element"
//! in the parent. When the parent is same-origin that is a direct identity
//! search over the parent's frame elements. When it is not, the parent's own
//! recorder must hand the answer down; the [`FrameRegistry`] carries those
//! announcements.

use std::collections::HashMap;
use std::sync::Arc;

use action_locator::LocatorSynthesizer;
use parking_lot::RwLock;
use soulrecorder_dom::{NodeId, Page, WindowId};
use tracing::debug;

use crate::errors::ContextError;
use crate::model::FrameDescriptor;

/// Outcome of resolving one frame level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameResolution {
    /// This level's descriptor; the walk continues with the parent window.
    Level(FrameDescriptor),
    /// The complete chain above and including this level, outermost first.
    /// The walk stops.
    Chain(Vec<FrameDescriptor>),
    /// Identity cannot be determined from this side of the boundary.
    Blocked,
}

/// Capability: identify the frame element hosting `window`.
pub trait FrameIdentityResolver: Send + Sync {
    fn resolve(&self, page: &Page, window: WindowId) -> Result<FrameResolution, ContextError>;

    fn name(&self) -> &'static str;
}

/// Describes `frame` as seen from inside its parent document.
pub fn describe_frame(
    page: &Page,
    synthesizer: &LocatorSynthesizer,
    parent_document: NodeId,
    frame: NodeId,
) -> Result<FrameDescriptor, ContextError> {
    let pair = synthesizer.synthesize(page, frame)?;
    let ordinal_index = page
        .frame_elements(parent_document)
        .iter()
        .position(|candidate| *candidate == frame);
    let attr = |name: &str| page.attr(frame, name).map(str::to_string);
    Ok(FrameDescriptor {
        locator: Some(pair.preferred().to_string()),
        id: attr("id"),
        name: attr("name"),
        src: attr("src"),
        ordinal_index,
        depth: 0,
        cross_origin_blocked: false,
    })
}

/// Direct DOM query through `parent.document`.
#[derive(Default)]
pub struct SameOriginFrameResolver {
    synthesizer: LocatorSynthesizer,
}

impl SameOriginFrameResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameIdentityResolver for SameOriginFrameResolver {
    fn resolve(&self, page: &Page, window: WindowId) -> Result<FrameResolution, ContextError> {
        let parent_document = match page.parent_document(window) {
            Ok(Some(document)) => document,
            Ok(None) => return Ok(FrameResolution::Chain(Vec::new())),
            Err(err) if err.is_cross_origin() => {
                debug!(target: "perceiver_context", %window, error = %err, "parent document blocked");
                return Ok(FrameResolution::Blocked);
            }
            Err(err) => return Err(err.into()),
        };
        let found = page
            .frame_elements(parent_document)
            .into_iter()
            .find(|frame| page.content_window(*frame) == Some(window));
        match found {
            Some(frame) => Ok(FrameResolution::Level(describe_frame(
                page,
                &self.synthesizer,
                parent_document,
                frame,
            )?)),
            None => Ok(FrameResolution::Blocked),
        }
    }

    fn name(&self) -> &'static str {
        "same-origin"
    }
}

/// Shared mailbox of descriptor chains announced by parent recorders, keyed
/// by the child window they were posted to.
#[derive(Default)]
pub struct FrameRegistry {
    chains: RwLock<HashMap<WindowId, Vec<FrameDescriptor>>>,
}

impl FrameRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn announce(&self, child: WindowId, chain: Vec<FrameDescriptor>) {
        debug!(target: "perceiver_context", %child, levels = chain.len(), "frame chain announced");
        self.chains.write().insert(child, chain);
    }

    pub fn lookup(&self, child: WindowId) -> Option<Vec<FrameDescriptor>> {
        self.chains.read().get(&child).cloned()
    }

    pub fn len(&self) -> usize {
        self.chains.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cooperative handshake: the parent supplies the descriptor data.
pub struct CrossOriginFrameResolver {
    registry: Arc<FrameRegistry>,
}

impl CrossOriginFrameResolver {
    pub fn new(registry: Arc<FrameRegistry>) -> Self {
        Self { registry }
    }
}

impl FrameIdentityResolver for CrossOriginFrameResolver {
    fn resolve(&self, _page: &Page, window: WindowId) -> Result<FrameResolution, ContextError> {
        Ok(match self.registry.lookup(window) {
            Some(chain) => FrameResolution::Chain(chain),
            None => FrameResolution::Blocked,
        })
    }

    fn name(&self) -> &'static str {
        "cross-origin-handshake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn registry_round_trip() {
        let registry = FrameRegistry::new();
        let page = Page::new("https://a.example/");
        let top = page.top_window();
        assert!(registry.is_empty());
        registry.announce(top, vec![FrameDescriptor::blocked(0)]);
        assert_eq!(registry.lookup(top), Some(vec![FrameDescriptor::blocked(0)]));
    }

    #[test]
    fn unannounced_child_is_blocked() {
        let page = Page::new("https://a.example/");
        let resolver = CrossOriginFrameResolver::new(FrameRegistry::new());
        assert_eq!(
            resolver.resolve(&page, page.top_window()).unwrap(),
            FrameResolution::Blocked
        );
    }
}
