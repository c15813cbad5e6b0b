//! Locator synthesis: strategy chain plus uniqueness verification

use soulrecorder_dom::{NodeId, Page};
use tracing::debug;

use crate::errors::LocatorError;
use crate::paths::full_path;
use crate::strategies::{default_strategies, Strategy};
use crate::types::{LocatorPair, LocatorScope};

/// Produces a [`LocatorPair`] for an element.
///
/// `primary` is the first candidate, in strategy order, that evaluates to
/// exactly the element inside its own tree. `full_path` is always computed
/// and never verified.
pub struct LocatorSynthesizer {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Default for LocatorSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl LocatorSynthesizer {
    pub fn new() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }

    pub fn with_strategies(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    pub fn synthesize(&self, page: &Page, element: NodeId) -> Result<LocatorPair, LocatorError> {
        if !page.is_element(element) {
            return Err(LocatorError::NotAnElement(element));
        }
        let scope = LocatorScope::of(page, element);
        let full_path = full_path(page, element);

        for strategy in &self.strategies {
            let Some(candidate) = strategy.propose(page, element, scope) else {
                continue;
            };
            if is_unique(page, &candidate.expression, scope.root(), element)? {
                debug!(
                    target: "action_locator",
                    strategy = strategy.name(),
                    expression = %candidate.expression,
                    "unique locator"
                );
                return Ok(LocatorPair {
                    primary: Some(candidate.expression),
                    full_path,
                    strategy: Some(candidate.strategy),
                });
            }
            debug!(
                target: "action_locator",
                strategy = strategy.name(),
                expression = %candidate.expression,
                "candidate not unique"
            );
        }

        debug!(target: "action_locator", %full_path, "no unique locator, full path only");
        Ok(LocatorPair {
            primary: None,
            full_path,
            strategy: None,
        })
    }
}

/// Evaluates `expression` against `context` and requires exactly one match
/// equal to `element`.
pub fn is_unique(
    page: &Page,
    expression: &str,
    context: NodeId,
    element: NodeId,
) -> Result<bool, LocatorError> {
    let matches = page.evaluate_xpath(expression, context)?;
    Ok(matches.len() == 1 && matches[0] == element)
}
