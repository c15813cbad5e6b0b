use serde::{Deserialize, Serialize};

/// Tunables for one recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Identical `(kind, locator)` actions closer than this collapse to one.
    pub dedup_window_ms: u64,
    /// Emit a page-marker action when recording starts in the top window.
    pub emit_page_marker: bool,
    /// Maximum characters of element text kept in snapshots.
    pub text_limit: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            dedup_window_ms: 300,
            emit_page_marker: true,
            text_limit: 100,
        }
    }
}
