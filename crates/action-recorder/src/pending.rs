use soulrecorder_dom::NodeId;

/// Text entry not yet committed by blur, Enter, Tab or stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInput {
    pub element: NodeId,
    pub value: Option<String>,
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
}

/// Per-element buffer; one entry per field, kept in first-touch order.
#[derive(Debug, Default)]
pub struct PendingInputs {
    entries: Vec<PendingInput>,
}

impl PendingInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest value for `element`, replacing the earlier one.
    pub fn update(&mut self, element: NodeId, value: Option<String>, at_ms: u64) {
        match self.entries.iter_mut().find(|entry| entry.element == element) {
            Some(entry) => {
                entry.value = value;
                entry.last_seen_ms = at_ms;
            }
            None => self.entries.push(PendingInput {
                element,
                value,
                first_seen_ms: at_ms,
                last_seen_ms: at_ms,
            }),
        }
    }

    pub fn take(&mut self, element: NodeId) -> Option<PendingInput> {
        let index = self.entries.iter().position(|entry| entry.element == element)?;
        Some(self.entries.remove(index))
    }

    pub fn drain(&mut self) -> Vec<PendingInput> {
        std::mem::take(&mut self.entries)
    }

    pub fn contains(&self, element: NodeId) -> bool {
        self.entries.iter().any(|entry| entry.element == element)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
