//! Single-producer, single-consumer ordered event channel (§4.G, §9 Design
//! Note: "model as a bounded channel owned by the engine, read by the
//! transport; cancellation is a channel-close observed at the producer's
//! next send").

use scholarly_core::error::{Error, Result};
use tokio::sync::mpsc;

use crate::event::Event;

/// Default channel capacity. Generous enough that a fast producer never
/// blocks on a well-behaved consumer, small enough to bound memory if the
/// consumer stalls.
pub const DEFAULT_CAPACITY: usize = 64;

/// The engine's half of the channel. `send` is the sole emission point;
/// every node emission in §4.E/§4.F goes through it.
#[derive(Clone)]
pub struct EventSender {
    inner: mpsc::Sender<Event>,
}

/// The transport's half of the channel.
pub struct EventReceiver {
    inner: mpsc::Receiver<Event>,
}

/// Builds a new bounded event channel.
#[must_use]
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { inner: tx }, EventReceiver { inner: rx })
}

impl EventSender {
    /// Emits one event. Returns `Err(Error::Cancelled)` when the consumer
    /// has dropped its receiver (transport closed or client disconnected);
    /// the engine must observe this at its next emission point and
    /// terminate the state machine cleanly without emitting further events
    /// (§4.G, §5 Cancellation).
    pub async fn send(&self, event: Event) -> Result<()> {
        self.inner.send(event).await.map_err(|_| Error::Cancelled)
    }

    /// Whether the consumer side is still attached. Cheap point-in-time
    /// check a node may use before doing work it would otherwise discard.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl EventReceiver {
    /// Awaits the next event in causal order. `None` once the producer has
    /// dropped its sender (run complete) and the buffer is drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.inner.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Step;

    #[tokio::test]
    async fn events_are_delivered_in_send_order() {
        let (tx, mut rx) = channel(DEFAULT_CAPACITY);
        tx.send(Event::status(Step::Guardrail, "a")).await.unwrap();
        tx.send(Event::status(Step::Routing, "b")).await.unwrap();
        tx.send(Event::Done).await.unwrap();
        drop(tx);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let third = rx.recv().await.unwrap();
        assert!(matches!(first, Event::Status { step: Step::Guardrail, .. }));
        assert!(matches!(second, Event::Status { step: Step::Routing, .. }));
        assert!(matches!(third, Event::Done));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropping_the_receiver_surfaces_as_cancellation() {
        let (tx, rx) = channel(DEFAULT_CAPACITY);
        drop(rx);
        let err = tx.send(Event::Done).await.unwrap_err();
        assert_eq!(err.code(), "cancelled");
    }
}
