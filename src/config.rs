//! Runtime configuration for the recorder CLI

use std::env;
use std::path::PathBuf;

use action_recorder::RecorderConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Environment variable that overrides [`Config::dedup_window_ms`].
pub const DEDUP_ENV: &str = "SOUL_RECORDER_DEDUP_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where `record --save` writes recordings
    pub output_dir: PathBuf,

    /// Identical actions closer than this are collapsed (ms)
    pub dedup_window_ms: u64,

    /// Virtual time between scripted steps (ms)
    pub step_gap_ms: u64,

    /// Capacity of the recorder -> coordinator bus
    pub bus_capacity: usize,

    /// Resolve cross-origin frames through parent announcements
    pub cross_origin_handshake: bool,

    /// Emit a page-marker action when recording starts
    pub emit_page_marker: bool,

    /// Maximum characters of element text kept per action
    pub text_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./soulrecorder-output"),
            dedup_window_ms: 300,
            step_gap_ms: 500,
            bus_capacity: 1024,
            cross_origin_handshake: true,
            emit_page_marker: true,
            text_limit: 100,
        }
    }
}

impl Config {
    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            dedup_window_ms: self.dedup_window_ms,
            emit_page_marker: self.emit_page_marker,
            text_limit: self.text_limit,
        }
    }

    /// Applies environment overrides on top of the loaded file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = env::var(DEDUP_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => {
                    info!(dedup_window_ms = ms, "dedup window overridden from {}", DEDUP_ENV);
                    self.dedup_window_ms = ms;
                }
                Err(_) => warn!(value = %raw, "ignoring invalid {}", DEDUP_ENV),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("dedup_window_ms: 50\nemit_page_marker: false\n").unwrap();
        assert_eq!(config.dedup_window_ms, 50);
        assert!(!config.emit_page_marker);
        assert_eq!(config.step_gap_ms, 500);
        assert_eq!(config.bus_capacity, 1024);
    }

    #[test]
    fn recorder_config_follows_file() {
        let config = Config {
            dedup_window_ms: 120,
            text_limit: 10,
            ..Config::default()
        };
        let recorder = config.recorder_config();
        assert_eq!(recorder.dedup_window_ms, 120);
        assert_eq!(recorder.text_limit, 10);
        assert!(recorder.emit_page_marker);
    }
}
