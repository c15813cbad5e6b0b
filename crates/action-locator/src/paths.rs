//! Positional paths and XPath literal quoting

use once_cell::sync::Lazy;
use regex::Regex;
use soulrecorder_dom::{NodeId, Page};

use crate::types::LocatorScope;

/// Ids produced by component frameworks or counters; they change between
/// renders and are never used as locators or anchors.
static GENERATED_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^[0-9]
        | ^(ember|react-|:r|mui-|ng-|radix-|headlessui-|vue-|data-v-|yui_|ext-|__)
        | ^[0-9a-f]{8}-[0-9a-f]{4}-
        | [0-9a-f]{16,}$
        ",
    )
    .unwrap_or_else(|err| panic!("generated-id pattern is invalid: {err}"))
});

/// True when `id` looks framework-generated.
pub fn is_generated_id(id: &str) -> bool {
    GENERATED_ID.is_match(id)
}

/// The element's `id`, when present, non-blank and not framework-generated.
pub fn stable_id(page: &Page, element: NodeId) -> Option<&str> {
    page.attr(element, "id")
        .map(str::trim)
        .filter(|id| !id.is_empty() && !is_generated_id(id))
}

/// Quotes `value` as an XPath string literal, falling back to `concat()`
/// when it contains both quote characters.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let mut parts = Vec::new();
    for (index, chunk) in value.split('"').enumerate() {
        if index > 0 {
            parts.push("'\"'".to_string());
        }
        if !chunk.is_empty() {
            parts.push(format!("\"{chunk}\""));
        }
    }
    format!("concat({})", parts.join(", "))
}

fn segment(page: &Page, element: NodeId) -> String {
    let tag = page.tag(element).unwrap_or("*");
    format!("{tag}[{}]", page.same_tag_position(element))
}

fn build_path(page: &Page, element: NodeId, use_anchor: bool) -> String {
    let scope = LocatorScope::of(page, element);
    let mut segments = vec![segment(page, element)];
    let mut anchor = None;
    let mut current = element;
    while let Some(parent) = page.parent_element(current) {
        if use_anchor {
            if let Some(id) = stable_id(page, parent) {
                anchor = Some(id);
                break;
            }
        }
        segments.push(segment(page, parent));
        current = parent;
    }
    segments.reverse();
    let tail = segments.join("/");
    match anchor {
        Some(id) => format!(
            "{}*[@id={}]/{}",
            scope.descendant_prefix(),
            xpath_literal(id),
            tail
        ),
        None => format!("{}{}", scope.child_prefix(), tail),
    }
}

/// Path from the nearest stable-id ancestor (or the tree root) down to the
/// element. The walk never leaves the element's tree, so inside a shadow root
/// the result is evaluated against that root.
pub fn relative_path(page: &Page, element: NodeId) -> String {
    build_path(page, element, true)
}

/// Position-indexed path from the tree root to the element.
pub fn full_path(page: &Page, element: NodeId) -> String {
    build_path(page, element, false)
}
