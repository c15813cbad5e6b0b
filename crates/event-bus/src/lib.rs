use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::warn;

use soulrecorder_core_types::SoulError;

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

/// Fire-and-forget channel. Publishing never blocks; it fails when nobody is
/// listening on the other side.
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    fn publish(&self, event: E) -> Result<usize, SoulError>;
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// Simple in-memory bus suitable for unit tests and the CLI harness.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }
}

impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    fn publish(&self, event: E) -> Result<usize, SoulError> {
        self.sender
            .send(event)
            .map_err(|err| SoulError::new(err.to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

/// Collects everything currently queued on a subscription without waiting.
pub fn drain<E>(rx: &mut broadcast::Receiver<E>) -> Vec<E>
where
    E: Event,
{
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => out.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(target: "event-bus", skipped, "subscriber lagged; events dropped");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    out
}
