//! # Subscriber trait.
//!
//! A [`Subscribe`] implementation receives every event of a run from its own
//! worker, behind a queue sized by [`Subscribe::queue_capacity`]. It may take
//! its time; once the queue is full, further events are skipped for it.

use async_trait::async_trait;

use crate::events::Event;

/// Receiver of runtime events, e.g. a log sink or a metrics exporter.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
