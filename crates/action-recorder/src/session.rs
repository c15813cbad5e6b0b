use std::sync::Arc;

use soulrecorder_event_bus::{drain, EventBus, InMemoryBus};
use tokio::sync::broadcast;
use tracing::info;

use crate::errors::RecorderError;
use crate::model::{Action, AssertionType, Recording};
use crate::protocol::RecorderEvent;
use crate::transport::BusTransport;

/// Coordinator side of the channel: receives events from every frame's
/// recorder and appends recorded actions to the session's [`Recording`].
pub struct RecordingSession {
    bus: Arc<InMemoryBus<RecorderEvent>>,
    rx: broadcast::Receiver<RecorderEvent>,
    recording: Recording,
    assertions: Vec<AssertionType>,
}

impl RecordingSession {
    pub fn start(
        bus: Arc<InMemoryBus<RecorderEvent>>,
        source_url: impl Into<String>,
        started_at_ms: u64,
    ) -> Self {
        let rx = bus.subscribe();
        let recording = Recording::start(source_url, started_at_ms);
        info!(target: "action_recorder", recording = %recording.id, "session opened");
        Self {
            bus,
            rx,
            recording,
            assertions: Vec::new(),
        }
    }

    /// Transport recorders use to reach this session.
    pub fn transport(&self) -> BusTransport {
        BusTransport::new(self.bus.clone())
    }

    /// Pulls queued events; returns the actions appended by this call.
    pub fn collect(&mut self) -> Result<Vec<Action>, RecorderError> {
        let mut appended = Vec::new();
        for event in drain(&mut self.rx) {
            match event {
                RecorderEvent::ActionRecorded { action } => {
                    self.recording.append((*action).clone())?;
                    appended.push(*action);
                }
                RecorderEvent::AssertionComplete { assertion_type } => {
                    self.assertions.push(assertion_type)
                }
                RecorderEvent::RecordingStopped { .. } => {}
            }
        }
        Ok(appended)
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn completed_assertions(&self) -> &[AssertionType] {
        &self.assertions
    }

    /// Collects what is left, seals and hands the recording over.
    pub fn finish(mut self, ended_at_ms: u64) -> Result<Recording, RecorderError> {
        self.collect()?;
        self.recording.seal(ended_at_ms);
        info!(
            target: "action_recorder",
            recording = %self.recording.id,
            actions = self.recording.len(),
            "recording sealed"
        );
        Ok(self.recording)
    }
}
