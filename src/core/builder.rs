use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::supervisor::{Listener, Supervisor};
use crate::{
    backends::{CheckpointBackend, FaultInjector},
    config::Config,
    events::Bus,
    ledger::CheckpointLedger,
    process::Spawner,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Supervisor`] with optional fault injection and subscribers.
pub struct SupervisorBuilder {
    cfg: Config,
    backend: Arc<dyn CheckpointBackend>,
    injector: Option<Arc<dyn FaultInjector>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a builder that checkpoints through `backend`.
    pub fn new(cfg: Config, backend: Arc<dyn CheckpointBackend>) -> Self {
        Self {
            cfg,
            backend,
            injector: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the fault injector.
    ///
    /// It is only used when [`Config::fault_interval`] is non-zero.
    pub fn with_injector(mut self, injector: Arc<dyn FaultInjector>) -> Self {
        self.injector = Some(injector);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor and starts the bus listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let ledger = Arc::new(CheckpointLedger::new(
            self.cfg.retention_clamped(),
            Arc::clone(&self.backend),
            bus.clone(),
        ));
        let listener = spawn_listener(&bus, SubscriberSet::new(self.subscribers));

        Supervisor {
            spawner: Spawner::new(bus.clone()),
            cfg: self.cfg,
            bus,
            ledger,
            backend: self.backend,
            injector: self.injector,
            listener,
        }
    }
}

/// Forwards bus events to `subs` until stopped, then flushes them.
fn spawn_listener(bus: &Bus, subs: SubscriberSet) -> Listener {
    let mut rx = bus.subscribe();
    let stop = CancellationToken::new();
    let token = stop.clone();

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        subs.shutdown().await;
    });

    Listener { stop, handle }
}
