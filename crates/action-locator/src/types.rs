//! Core types for locator synthesis

use serde::{Deserialize, Serialize};
use soulrecorder_dom::{NodeId, Page};

/// Locator strategy enumeration, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorStrategy {
    /// Stable `id` attribute
    Id,

    /// `data-testid` and friends
    TestAttribute,

    /// `name` attribute scoped to tag
    Name,

    /// Short `aria-label`
    AriaLabel,

    /// Normalized text of buttons and links
    Text,

    /// `placeholder` attribute
    Placeholder,

    /// Positional path below the nearest stable-id ancestor
    RelativePath,
}

impl LocatorStrategy {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Id => "id",
            LocatorStrategy::TestAttribute => "test-attribute",
            LocatorStrategy::Name => "name",
            LocatorStrategy::AriaLabel => "aria-label",
            LocatorStrategy::Text => "text",
            LocatorStrategy::Placeholder => "placeholder",
            LocatorStrategy::RelativePath => "relative-path",
        }
    }

    /// Get all strategies in fallback order
    pub fn fallback_chain() -> Vec<LocatorStrategy> {
        vec![
            LocatorStrategy::Id,
            LocatorStrategy::TestAttribute,
            LocatorStrategy::Name,
            LocatorStrategy::AriaLabel,
            LocatorStrategy::Text,
            LocatorStrategy::Placeholder,
            LocatorStrategy::RelativePath,
        ]
    }
}

/// The tree an element's locators are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorScope {
    Document(NodeId),
    ShadowRoot(NodeId),
}

impl LocatorScope {
    pub fn of(page: &Page, element: NodeId) -> Self {
        let root = page.root_node(element);
        if page.is_shadow_root(root) {
            LocatorScope::ShadowRoot(root)
        } else {
            LocatorScope::Document(root)
        }
    }

    /// Context node for evaluation.
    pub fn root(&self) -> NodeId {
        match self {
            LocatorScope::Document(root) | LocatorScope::ShadowRoot(root) => *root,
        }
    }

    /// Prefix selecting any descendant of the scope.
    pub fn descendant_prefix(&self) -> &'static str {
        match self {
            LocatorScope::Document(_) => "//",
            LocatorScope::ShadowRoot(_) => ".//",
        }
    }

    /// Prefix selecting the scope's direct children.
    pub fn child_prefix(&self) -> &'static str {
        match self {
            LocatorScope::Document(_) => "/",
            LocatorScope::ShadowRoot(_) => "./",
        }
    }
}

/// Candidate expression produced by one strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub expression: String,
    pub strategy: LocatorStrategy,
}

impl Candidate {
    pub fn new(expression: String, strategy: LocatorStrategy) -> Self {
        Self {
            expression,
            strategy,
        }
    }
}

/// Result of synthesis for one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocatorPair {
    /// Shortest candidate that resolved to exactly this element, if any.
    pub primary: Option<String>,

    /// Absolute positional path. Not verified; may break under mutation.
    pub full_path: String,

    /// Strategy that produced `primary`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<LocatorStrategy>,
}

impl LocatorPair {
    /// The expression consumers should try first.
    pub fn preferred(&self) -> &str {
        self.primary.as_deref().unwrap_or(&self.full_path)
    }

    pub fn is_unique(&self) -> bool {
        self.primary.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_chain_order() {
        let chain = LocatorStrategy::fallback_chain();
        assert_eq!(chain.len(), 7);
        assert_eq!(chain[0], LocatorStrategy::Id);
        assert_eq!(chain[1], LocatorStrategy::TestAttribute);
        assert_eq!(chain[6], LocatorStrategy::RelativePath);
    }

    #[test]
    fn preferred_falls_back_to_full_path() {
        let pair = LocatorPair {
            primary: None,
            full_path: "/html[1]/body[1]/div[3]".into(),
            strategy: None,
        };
        assert_eq!(pair.preferred(), "/html[1]/body[1]/div[3]");
        assert!(!pair.is_unique());
    }

    #[test]
    fn pair_serializes_camel_case() {
        let pair = LocatorPair {
            primary: Some("//button[@id=\"go\"]".into()),
            full_path: "/html[1]/body[1]/button[1]".into(),
            strategy: Some(LocatorStrategy::Id),
        };
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["fullPath"], "/html[1]/body[1]/button[1]");
        assert_eq!(json["strategy"], "id");
    }
}
