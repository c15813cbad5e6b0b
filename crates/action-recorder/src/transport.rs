use std::sync::Arc;

use soulrecorder_event_bus::{EventBus, InMemoryBus};
use tracing::{debug, warn};

use crate::errors::TransportError;
use crate::protocol::RecorderEvent;

/// Outbound port towards the coordinating process. Fire-and-forget.
pub trait Transport: Send + Sync {
    fn send(&self, event: &RecorderEvent) -> Result<(), TransportError>;
}

/// Transport over the in-memory bus. Fails while nobody subscribes.
pub struct BusTransport {
    bus: Arc<InMemoryBus<RecorderEvent>>,
}

impl BusTransport {
    pub fn new(bus: Arc<InMemoryBus<RecorderEvent>>) -> Self {
        Self { bus }
    }
}

impl Transport for BusTransport {
    fn send(&self, event: &RecorderEvent) -> Result<(), TransportError> {
        self.bus
            .publish(event.clone())
            .map(|_| ())
            .map_err(|err| TransportError::Unavailable(err.to_string()))
    }
}

/// Sends `event`, retrying once when the first attempt fails and
/// `still_recording` holds. Failures are logged and dropped.
pub fn deliver(transport: &dyn Transport, event: &RecorderEvent, still_recording: bool) -> bool {
    match transport.send(event) {
        Ok(()) => true,
        Err(err) if still_recording => {
            debug!(target: "action_recorder", error = %err, "delivery failed, retrying once");
            match transport.send(event) {
                Ok(()) => true,
                Err(err) => {
                    warn!(target: "action_recorder", error = %err, "event dropped after retry");
                    false
                }
            }
        }
        Err(err) => {
            warn!(target: "action_recorder", error = %err, "event dropped");
            false
        }
    }
}
