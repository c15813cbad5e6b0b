//! Listener coverage across a mutating page.
//!
//! Roots needing observation go through a worklist processed to a fixed
//! point. Each processed root lands in a visited set, so a root reachable
//! twice (initial scan and a later mutation) is attached once. Only open
//! shadow roots can be found this way; closed roots stay unobserved and
//! their events reach the recorder retargeted to the host, if at all.

use std::collections::{HashSet, VecDeque};

use soulrecorder_dom::{MutationRecord, NodeId, Page};
use tracing::{debug, trace};

use crate::events::DomEventKind;

#[derive(Debug, Default)]
pub struct ObservationManager {
    observed: HashSet<NodeId>,
    order: Vec<NodeId>,
}

impl ObservationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches to `document` and every open shadow root below it.
    /// Returns the number of roots observed.
    pub fn attach(&mut self, page: &Page, document: NodeId) -> usize {
        let mut worklist = VecDeque::from([document]);
        self.process(page, &mut worklist)
    }

    pub fn detach(&mut self) {
        debug!(target: "action_recorder", roots = self.observed.len(), "observers disconnected");
        self.observed.clear();
        self.order.clear();
    }

    fn process(&mut self, page: &Page, worklist: &mut VecDeque<NodeId>) -> usize {
        let mut attached = 0;
        while let Some(root) = worklist.pop_front() {
            if !self.observed.insert(root) {
                continue;
            }
            self.order.push(root);
            attached += 1;
            trace!(target: "action_recorder", %root, "listeners attached");
            for element in page.descendants(root) {
                if let Some(shadow) = page.open_shadow_root(element) {
                    if !self.observed.contains(&shadow) {
                        worklist.push_back(shadow);
                    }
                }
            }
        }
        attached
    }

    /// Handles structural changes reported by observed roots. New shadow
    /// roots anywhere inside added subtrees are attached and observed.
    pub fn on_mutations(&mut self, page: &Page, records: &[MutationRecord]) -> usize {
        let mut worklist = VecDeque::new();
        for record in records.iter().filter(|record| self.observed.contains(&record.root)) {
            for added in &record.added {
                if !page.is_element(*added) {
                    continue;
                }
                if let Some(shadow) = page.open_shadow_root(*added) {
                    worklist.push_back(shadow);
                }
                for element in page.descendants(*added) {
                    if let Some(shadow) = page.open_shadow_root(element) {
                        worklist.push_back(shadow);
                    }
                }
            }
        }
        let attached = self.process(page, &mut worklist);
        if attached > 0 {
            debug!(target: "action_recorder", attached, total = self.observed.len(), "new shadow roots observed");
        }
        attached
    }

    pub fn observed_roots(&self) -> &[NodeId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// The target a capture listener sees for an event fired at `target`,
    /// or `None` when no listener is reached.
    pub fn listener_target(&self, page: &Page, kind: &DomEventKind, target: NodeId) -> Option<NodeId> {
        if !page.is_connected(target) {
            return None;
        }
        let mut current = target;
        loop {
            let root = page.root_node(current);
            if self.observed.contains(&root) {
                return Some(current);
            }
            if !kind.is_composed() {
                return None;
            }
            current = page.shadow_host(root)?;
        }
    }
}
