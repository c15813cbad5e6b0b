//! Folds locator, frame and shadow context, value and snapshot into one
//! [`Action`], and suppresses duplicates.

use std::sync::Arc;

use action_locator::{LocatorPair, LocatorSynthesizer};
use perceiver_context::{trace_shadow_context, FrameTracer};
use soulrecorder_core_types::ActionId;
use soulrecorder_dom::{NodeId, Page, WindowId};
use tracing::debug;

use crate::describe::{describe, describe_page};
use crate::errors::RecorderError;
use crate::model::{Action, ActionKind, ElementSnapshot, ValuePayload};

#[derive(Debug, Clone, PartialEq, Eq)]
struct LastEmitted {
    kind: ActionKind,
    key: String,
    at_ms: u64,
}

pub struct ActionNormalizer {
    synthesizer: LocatorSynthesizer,
    frames: Arc<FrameTracer>,
    dedup_window_ms: u64,
    text_limit: usize,
    last: Option<LastEmitted>,
}

impl ActionNormalizer {
    pub fn new(frames: Arc<FrameTracer>, dedup_window_ms: u64, text_limit: usize) -> Self {
        Self {
            synthesizer: LocatorSynthesizer::new(),
            frames,
            dedup_window_ms,
            text_limit,
            last: None,
        }
    }

    /// Builds the action for `element`. Assembly is all-or-nothing: any
    /// failure returns an error and nothing is recorded.
    pub fn assemble(
        &self,
        page: &Page,
        window: WindowId,
        kind: ActionKind,
        element: NodeId,
        payload: ValuePayload,
        at_ms: u64,
    ) -> Result<Action, RecorderError> {
        let locator = self.synthesizer.synthesize(page, element)?;
        let frame_context = self.frames.trace(page, window)?;
        let shadow_context = trace_shadow_context(page, &self.synthesizer, element)?;
        let element_snapshot = ElementSnapshot::capture(page, element, self.text_limit);
        let description = describe(page, element, kind, &payload);
        Ok(Action {
            id: ActionId::new(),
            kind,
            locator,
            element: element_snapshot,
            frame_context,
            shadow_context,
            payload,
            description,
            timestamp: at_ms,
        })
    }

    /// Assembles and applies duplicate suppression. `Ok(None)` means the
    /// action was a duplicate and was dropped.
    pub fn normalize(
        &mut self,
        page: &Page,
        window: WindowId,
        kind: ActionKind,
        element: NodeId,
        payload: ValuePayload,
        at_ms: u64,
    ) -> Result<Option<Action>, RecorderError> {
        let action = self.assemble(page, window, kind, element, payload, at_ms)?;
        if self.is_duplicate(&action) {
            debug!(
                target: "action_recorder",
                kind = %action.kind,
                locator = action.locator.preferred(),
                "duplicate dropped"
            );
            return Ok(None);
        }
        let (kind, key) = action.dedup_key();
        self.last = Some(LastEmitted {
            kind,
            key: key.to_string(),
            at_ms: action.timestamp,
        });
        Ok(Some(action))
    }

    fn is_duplicate(&self, action: &Action) -> bool {
        let Some(last) = &self.last else {
            return false;
        };
        let (kind, key) = action.dedup_key();
        last.kind == kind
            && last.key == key
            && action.timestamp.saturating_sub(last.at_ms) < self.dedup_window_ms
    }

    /// Marker for the page a recording starts on. Not subject to dedup.
    pub fn page_marker(&self, page: &Page, window: WindowId, at_ms: u64) -> Action {
        let url = page.window(window).url().to_string();
        let document = page.document(window);
        let full_path = page
            .document_element(document)
            .and_then(|root| page.tag(root))
            .map(|tag| format!("/{tag}[1]"))
            .unwrap_or_else(|| "/".to_string());
        Action {
            id: ActionId::new(),
            kind: ActionKind::PageMarker,
            locator: LocatorPair {
                primary: None,
                full_path,
                strategy: None,
            },
            element: ElementSnapshot::default(),
            frame_context: Vec::new(),
            shadow_context: Vec::new(),
            description: describe_page(&url),
            payload: ValuePayload::Page { url },
            timestamp: at_ms,
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
