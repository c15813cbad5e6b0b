//! SoulRecorder CLI library
//!
//! Session scripts, the harness that replays them through the recorder,
//! and the command-line front end.

pub mod cli;
pub mod config;
pub mod errors;
pub mod harness;
pub mod script;

pub use config::Config;
pub use errors::ScriptError;
pub use harness::{resolve, ElementReport, SessionHarness, SessionOutcome, WindowStatus};
pub use script::{SessionScript, Step, TargetRef};
