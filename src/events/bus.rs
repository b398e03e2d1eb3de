//! # Runtime event bus.
//!
//! The runner, the recovery controller, the ledger and the output relays all
//! publish onto one [`Bus`]. The supervisor keeps a single listener on it that
//! forwards to the subscriber set; tests subscribe directly.
//!
//! ```text
//! runner, recovery, ledger, relays ── publish ──► Bus ──► listener ──► SubscriberSet
//!                                                  └────► test receivers
//! ```
//!
//! Publishing never waits. The channel keeps the last `capacity` events; a
//! receiver that falls further behind gets `Lagged(n)` and resumes after the
//! gap, and the listener logs it. Events published while nobody listens are lost.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable handle for publishing and observing [`Event`]s.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus keeping the last `capacity` (min 1) events.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Sends `ev` to current receivers; dropped when there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn subscriber_sees_events_published_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ProcessStarted));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ProcessExited).with_pid(7));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ProcessExited);
        assert_eq!(ev.pid, Some(7));
    }
}
