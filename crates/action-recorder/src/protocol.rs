//! Messages exchanged with the coordinating process.

use serde::{Deserialize, Serialize};

use crate::model::{Action, AssertionType};
use crate::state::RecorderState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecorderCommand {
    StartRecording,
    StopRecording,
    EnterAssertionMode { assertion_type: AssertionType },
    ExitAssertionMode,
    GetStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatus {
    pub state: RecorderState,
    pub action_count: usize,
    pub pending_inputs: usize,
    pub observed_roots: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecorderEvent {
    ActionRecorded { action: Box<Action> },
    AssertionComplete { assertion_type: AssertionType },
    RecordingStopped { action_count: usize },
}

/// What a command produced, besides any events it emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Ack,
    Status(RecorderStatus),
}
