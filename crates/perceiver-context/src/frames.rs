use std::sync::Arc;

use action_locator::LocatorSynthesizer;
use soulrecorder_dom::{Page, WindowId};
use tracing::debug;

use crate::errors::ContextError;
use crate::model::FrameDescriptor;
use crate::resolver::{
    describe_frame, CrossOriginFrameResolver, FrameIdentityResolver, FrameRegistry,
    FrameResolution, SameOriginFrameResolver,
};

/// Walks a window's frame ancestry, choosing a resolver per level.
pub struct FrameTracer {
    same_origin: SameOriginFrameResolver,
    cross_origin: Option<CrossOriginFrameResolver>,
    registry: Option<Arc<FrameRegistry>>,
    synthesizer: LocatorSynthesizer,
}

impl Default for FrameTracer {
    fn default() -> Self {
        Self::same_origin_only()
    }
}

impl FrameTracer {
    /// Tracer with the handshake fallback for cross-origin parents.
    pub fn with_handshake(registry: Arc<FrameRegistry>) -> Self {
        Self {
            same_origin: SameOriginFrameResolver::new(),
            cross_origin: Some(CrossOriginFrameResolver::new(registry.clone())),
            registry: Some(registry),
            synthesizer: LocatorSynthesizer::new(),
        }
    }

    pub fn same_origin_only() -> Self {
        Self {
            same_origin: SameOriginFrameResolver::new(),
            cross_origin: None,
            registry: None,
            synthesizer: LocatorSynthesizer::new(),
        }
    }

    /// Frame chain for `window`, outermost first. Empty for the top window.
    pub fn trace(&self, page: &Page, window: WindowId) -> Result<Vec<FrameDescriptor>, ContextError> {
        let mut inner_first = Vec::new();
        let mut current = window;
        let mut depth = 0;

        while !page.is_top(current) {
            let mut resolution = self.same_origin.resolve(page, current)?;
            let mut resolver = self.same_origin.name();
            if resolution == FrameResolution::Blocked {
                if let Some(cross_origin) = &self.cross_origin {
                    resolution = cross_origin.resolve(page, current)?;
                    resolver = cross_origin.name();
                }
            }
            debug!(target: "perceiver_context", %current, depth, resolver, "frame level");

            match resolution {
                FrameResolution::Level(mut descriptor) => {
                    descriptor.depth = depth;
                    inner_first.push(descriptor);
                    match page.parent_window(current) {
                        Some(parent) => current = parent,
                        None => break,
                    }
                    depth += 1;
                }
                FrameResolution::Chain(chain) => {
                    let levels = chain.len();
                    let mut outer_first = chain;
                    for (offset, descriptor) in outer_first.iter_mut().enumerate() {
                        descriptor.depth = depth + levels - 1 - offset;
                    }
                    outer_first.extend(inner_first.into_iter().rev());
                    return Ok(outer_first);
                }
                FrameResolution::Blocked => {
                    inner_first.push(FrameDescriptor::blocked(depth));
                    break;
                }
            }
        }

        inner_first.reverse();
        Ok(inner_first)
    }

    /// Posts a descriptor chain to every child frame of `window`, which is
    /// how a cross-origin child learns where it sits.
    pub fn announce_children(&self, page: &Page, window: WindowId) -> Result<usize, ContextError> {
        let Some(registry) = &self.registry else {
            return Ok(0);
        };
        let own_chain = self.trace(page, window)?;
        let document = page.document(window);
        let mut announced = 0;
        for frame in page.frame_elements(document) {
            let Some(child) = page.content_window(frame) else {
                continue;
            };
            let mut chain = own_chain.clone();
            chain.push(describe_frame(page, &self.synthesizer, document, frame)?);
            registry.announce(child, chain);
            announced += 1;
        }
        Ok(announced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn top_window_has_no_frames() {
        let page = Page::parse("<html><body></body></html>", "https://a.example/").unwrap();
        let chain = FrameTracer::default().trace(&page, page.top_window()).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn nested_same_origin_frames_are_outermost_first() {
        let page = Page::parse(
            r#"<html><body><iframe name="outer" srcdoc="<iframe id='inner' srcdoc='<p>x</p>'></iframe>"></iframe></body></html>"#,
            "https://a.example/",
        )
        .unwrap();
        let innermost = page.windows().last().unwrap();
        let chain = FrameTracer::default().trace(&page, innermost).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name.as_deref(), Some("outer"));
        assert_eq!(chain[0].depth, 1);
        assert_eq!(chain[1].id.as_deref(), Some("inner"));
        assert_eq!(chain[1].depth, 0);
        assert!(chain.iter().all(|frame| !frame.cross_origin_blocked));
    }
}
