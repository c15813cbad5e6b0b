use clap::Subcommand;

use super::locate::LocateArgs;
use super::record::RecordArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Replay a session script through the recorder and emit the recording
    Record(RecordArgs),

    /// Show the locator and frame/shadow context synthesized for one element
    Locate(LocateArgs),

    /// Show build information and the effective configuration
    Info,
}
