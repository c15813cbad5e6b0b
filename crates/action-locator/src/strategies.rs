//! Candidate generation strategies
//!
//! Each strategy proposes at most one expression for an element. Strategies
//! never check uniqueness themselves; the synthesizer evaluates every
//! candidate against the element's tree and keeps the first exact match.

use soulrecorder_dom::{normalize_space, NodeId, Page};

use crate::paths::{relative_path, stable_id, xpath_literal};
use crate::types::{Candidate, LocatorScope, LocatorStrategy};

/// Test-oriented attributes in priority order.
pub const TEST_ATTRIBUTES: &[&str] = &[
    "data-testid",
    "data-test-id",
    "data-cy",
    "data-test",
    "data-automation-id",
    "data-e2e",
];

const ARIA_LABEL_LIMIT: usize = 50;
const TEXT_LIMIT: usize = 40;

/// Strategy trait for candidate generation
pub trait Strategy: Send + Sync {
    /// Propose a candidate expression for `element`, if this strategy applies.
    fn propose(&self, page: &Page, element: NodeId, scope: LocatorScope) -> Option<Candidate>;

    /// Get strategy type
    fn strategy_type(&self) -> LocatorStrategy;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.strategy_type().name()
    }
}

fn attribute_candidate(
    page: &Page,
    element: NodeId,
    scope: LocatorScope,
    attr: &str,
    value: &str,
    strategy: LocatorStrategy,
) -> Option<Candidate> {
    let tag = page.tag(element)?;
    Some(Candidate::new(
        format!(
            "{}{}[@{}={}]",
            scope.descendant_prefix(),
            tag,
            attr,
            xpath_literal(value)
        ),
        strategy,
    ))
}

fn non_empty<'a>(page: &'a Page, element: NodeId, attr: &str) -> Option<&'a str> {
    page.attr(element, attr).filter(|value| !value.trim().is_empty())
}

/// Stable `id` attribute
pub struct IdStrategy;

impl Strategy for IdStrategy {
    fn propose(&self, page: &Page, element: NodeId, scope: LocatorScope) -> Option<Candidate> {
        let id = stable_id(page, element)?;
        attribute_candidate(page, element, scope, "id", id, self.strategy_type())
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Id
    }
}

/// First present test attribute
pub struct TestAttributeStrategy;

impl Strategy for TestAttributeStrategy {
    fn propose(&self, page: &Page, element: NodeId, scope: LocatorScope) -> Option<Candidate> {
        TEST_ATTRIBUTES.iter().find_map(|attr| {
            let value = non_empty(page, element, attr)?;
            attribute_candidate(page, element, scope, attr, value, self.strategy_type())
        })
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::TestAttribute
    }
}

/// `name` attribute scoped to tag
pub struct NameStrategy;

impl Strategy for NameStrategy {
    fn propose(&self, page: &Page, element: NodeId, scope: LocatorScope) -> Option<Candidate> {
        let name = non_empty(page, element, "name")?;
        attribute_candidate(page, element, scope, "name", name, self.strategy_type())
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Name
    }
}

/// Short `aria-label`
pub struct AriaLabelStrategy;

impl Strategy for AriaLabelStrategy {
    fn propose(&self, page: &Page, element: NodeId, scope: LocatorScope) -> Option<Candidate> {
        let label = non_empty(page, element, "aria-label")?;
        if label.chars().count() >= ARIA_LABEL_LIMIT {
            return None;
        }
        attribute_candidate(page, element, scope, "aria-label", label, self.strategy_type())
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::AriaLabel
    }
}

/// Normalized text, for buttons and links only
pub struct TextStrategy;

impl Strategy for TextStrategy {
    fn propose(&self, page: &Page, element: NodeId, scope: LocatorScope) -> Option<Candidate> {
        let tag = page.tag(element)?;
        if tag != "button" && tag != "a" {
            return None;
        }
        let raw = page.text_content(element);
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.contains('\n') {
            return None;
        }
        let text = normalize_space(trimmed);
        if text.chars().count() >= TEXT_LIMIT {
            return None;
        }
        Some(Candidate::new(
            format!(
                "{}{}[normalize-space(.)={}]",
                scope.descendant_prefix(),
                tag,
                xpath_literal(&text)
            ),
            self.strategy_type(),
        ))
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Text
    }
}

/// `placeholder` attribute
pub struct PlaceholderStrategy;

impl Strategy for PlaceholderStrategy {
    fn propose(&self, page: &Page, element: NodeId, scope: LocatorScope) -> Option<Candidate> {
        let placeholder = non_empty(page, element, "placeholder")?;
        attribute_candidate(
            page,
            element,
            scope,
            "placeholder",
            placeholder,
            self.strategy_type(),
        )
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Placeholder
    }
}

/// Positional path below the nearest stable anchor
pub struct RelativePathStrategy;

impl Strategy for RelativePathStrategy {
    fn propose(&self, page: &Page, element: NodeId, _scope: LocatorScope) -> Option<Candidate> {
        Some(Candidate::new(
            relative_path(page, element),
            self.strategy_type(),
        ))
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::RelativePath
    }
}

/// Strategies in fallback order.
pub fn default_strategies() -> Vec<Box<dyn Strategy>> {
    LocatorStrategy::fallback_chain()
        .into_iter()
        .map(|strategy| -> Box<dyn Strategy> {
            match strategy {
                LocatorStrategy::Id => Box::new(IdStrategy),
                LocatorStrategy::TestAttribute => Box::new(TestAttributeStrategy),
                LocatorStrategy::Name => Box::new(NameStrategy),
                LocatorStrategy::AriaLabel => Box::new(AriaLabelStrategy),
                LocatorStrategy::Text => Box::new(TextStrategy),
                LocatorStrategy::Placeholder => Box::new(PlaceholderStrategy),
                LocatorStrategy::RelativePath => Box::new(RelativePathStrategy),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page_and(html: &str, xpath: &str) -> (Page, NodeId, LocatorScope) {
        let page = Page::parse(html, "https://a.example/").unwrap();
        let doc = page.document(page.top_window());
        let element = page.evaluate_xpath(xpath, doc).unwrap()[0];
        let scope = LocatorScope::of(&page, element);
        (page, element, scope)
    }

    #[test]
    fn test_attribute_priority() {
        let (page, el, scope) = page_and(
            r#"<div data-cy="cy" data-testid="tid">x</div>"#,
            "//div",
        );
        let candidate = TestAttributeStrategy.propose(&page, el, scope).unwrap();
        assert_eq!(candidate.expression, r#"//div[@data-testid="tid"]"#);
    }

    #[test]
    fn generated_id_is_not_proposed() {
        let (page, el, scope) = page_and(r#"<input id="react-select-2-input">"#, "//input");
        assert!(IdStrategy.propose(&page, el, scope).is_none());
    }

    #[test]
    fn long_aria_label_is_rejected() {
        let label = "x".repeat(60);
        let (page, el, scope) = page_and(&format!(r#"<button aria-label="{label}">a</button>"#), "//button");
        assert!(AriaLabelStrategy.propose(&page, el, scope).is_none());
    }

    #[test]
    fn text_only_for_buttons_and_links() {
        let (page, el, scope) = page_and("<a>  Sign   in </a><span>Sign in</span>", "//a");
        let candidate = TextStrategy.propose(&page, el, scope).unwrap();
        assert_eq!(candidate.expression, r#"//a[normalize-space(.)="Sign in"]"#);

        let (page, el, scope) = page_and("<span>Sign in</span>", "//span");
        assert!(TextStrategy.propose(&page, el, scope).is_none());
    }

    #[test]
    fn multi_line_text_is_rejected() {
        let (page, el, scope) = page_and("<button>Line one\nLine two</button>", "//button");
        assert!(TextStrategy.propose(&page, el, scope).is_none());
    }

    #[test]
    fn chain_matches_fallback_order() {
        let names: Vec<_> = default_strategies().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["id", "test-attribute", "name", "aria-label", "text", "placeholder", "relative-path"]
        );
    }
}
