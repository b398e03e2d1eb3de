//! # Per-subscriber delivery queues.
//!
//! The bus listener hands every event to [`SubscriberSet::emit`], which only
//! enqueues it. Each subscriber drains its own bounded queue from a dedicated
//! task, so a slow `LogWriter` never holds up a metrics sink and neither one
//! holds up the supervision loop.
//!
//! A subscriber sees events in publish order. When its queue is full the event
//! is skipped for that subscriber only and a warning is logged. A panic in
//! `on_event` is logged and the worker moves on to the next event.
//!
//! ```text
//! listener ─► emit(ev) ─┬─► queue(LogWriter) ─► worker ─► on_event
//!                       └─► queue(custom)    ─► worker ─► on_event
//! shutdown() ─► close queues ─► workers finish the backlog ─► joined
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;

use crate::events::Event;

use super::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Subscribers of one supervisor, each behind its own queue and worker.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Spawns a worker for each of `subs`. Needs a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        warn!(subscriber = sub.name(), "subscriber panicked: {:?}", panic_err);
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self { channels, workers }
    }

    /// Queues `event` for every subscriber without waiting for any of them.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for channel in &self.channels {
            match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = channel.name, "dropped event: queue full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(subscriber = channel.name, "dropped event: worker closed");
                }
            }
        }
    }

    /// Closes the queues and waits until each worker has handled its backlog.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True when nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}
