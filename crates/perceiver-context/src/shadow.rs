use std::collections::BTreeMap;

use action_locator::{relative_path, LocatorSynthesizer};
use soulrecorder_dom::{NodeId, Page, ShadowRootMode};

use crate::errors::ContextError;
use crate::model::{ShadowHostDescriptor, CLOSED_SHADOW_NOTE};

/// Shadow-host chain for `element`, outermost host first. Empty when the
/// element lives directly in a document.
pub fn trace_shadow_context(
    page: &Page,
    synthesizer: &LocatorSynthesizer,
    element: NodeId,
) -> Result<Vec<ShadowHostDescriptor>, ContextError> {
    let mut inner_first = Vec::new();
    let mut current = element;

    loop {
        let root = page.root_node(current);
        let Some(host) = page.shadow_host(root) else {
            break;
        };
        let mode = page.shadow_mode(root).unwrap_or(ShadowRootMode::Open);
        let host_locator = synthesizer.synthesize(page, host)?;
        let host_attributes: BTreeMap<String, String> = page
            .element(host)
            .map(|data| data.attrs().iter().cloned().collect())
            .unwrap_or_default();
        inner_first.push(ShadowHostDescriptor {
            host_locator: host_locator.preferred().to_string(),
            host_tag: page.tag(host).unwrap_or_default().to_string(),
            host_attributes,
            inner_path_within_root: relative_path(page, current),
            mode,
            note: (mode == ShadowRootMode::Closed).then(|| CLOSED_SHADOW_NOTE.to_string()),
        });
        current = host;
    }

    inner_first.reverse();
    Ok(inner_first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn light_dom_element_has_no_shadow_context() {
        let page = Page::parse("<html><body><p>x</p></body></html>", "https://a.example/").unwrap();
        let doc = page.document(page.top_window());
        let p = page.evaluate_xpath("//p", doc).unwrap()[0];
        let chain = trace_shadow_context(&page, &LocatorSynthesizer::new(), p).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn closed_root_carries_note() {
        let page = Page::parse(
            r#"<html><body><x-pay id="pay"><template shadowrootmode="closed"><input></template></x-pay></body></html>"#,
            "https://a.example/",
        )
        .unwrap();
        let doc = page.document(page.top_window());
        let host = page.evaluate_xpath("//x-pay", doc).unwrap()[0];
        let root = page.shadow_root_any(host).unwrap();
        let input = page.element_children(root)[0];
        let chain = trace_shadow_context(&page, &LocatorSynthesizer::new(), input).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].mode, ShadowRootMode::Closed);
        assert_eq!(chain[0].host_locator, r#"//x-pay[@id="pay"]"#);
        assert_eq!(chain[0].inner_path_within_root, "./input[1]");
        assert!(chain[0].note.is_some());
    }
}
