//! # Recovery controller: restore from the newest usable checkpoint until a clean exit.
//!
//! Drives successive [`supervise`] calls as an explicit state machine:
//!
//! ```text
//!            launch
//!              │
//!              ▼
//!   ┌──► Supervising(process) ── clean exit ──────────────► Finalize(Success)
//!   │          │
//!   │          └─ abnormal exit
//!   │                 ▼
//!   │          Failed(error) ── ledger has no usable record ──► Finalize(Failure)
//!   │                 │
//!   │                 │  newest.retries >= limit ─► evict, look at next-older
//!   │                 │  otherwise ─► record_retry, restore
//!   │                 ▼
//!   └──────── restore Ok
//!                     restore Err ─► Abort:    drain, RuntimeError::RestoreFailed
//!                                 └► Fallback: evict, back to Failed(error)
//!
//! Finalize(v): drain the ledger, return v
//! ```
//!
//! ## Rules
//! - Attempts are strictly sequential; the ledger and counters have one writer.
//! - A record is never restored more than `retry_limit` times: the check happens
//!   before the increment, so eviction occurs exactly at the boundary.
//! - Evicting an exhausted record starts no process.
//! - Every exit path drains the ledger.

use std::sync::Arc;

use crate::{
    backends::{CheckpointBackend, FaultInjector},
    config::{Config, RestoreFailurePolicy},
    core::runner::{AttemptContext, supervise},
    error::{BackendError, ProcessError, RuntimeError},
    events::{Bus, Event, EventKind},
    ledger::{CheckpointLedger, CheckpointRecord, EvictReason},
    process::{Launch, RunningProcess, Spawner},
    stats::{Stats, Verdict},
};

enum State {
    Supervising {
        process: RunningProcess,
        restored_from: Option<u64>,
    },
    Failed(ProcessError),
    Finalize(Verdict),
}

/// Owns the recovery policy for one run.
pub(crate) struct RecoveryController<'a> {
    pub cfg: &'a Config,
    pub ledger: &'a Arc<CheckpointLedger>,
    pub backend: &'a Arc<dyn CheckpointBackend>,
    pub injector: Option<&'a Arc<dyn FaultInjector>>,
    pub spawner: &'a Spawner,
    pub bus: &'a Bus,
}

impl RecoveryController<'_> {
    /// Runs `program` to a verdict, restoring from checkpoints on abnormal exits.
    pub async fn run(&self, program: &dyn Launch, stats: &mut Stats) -> Result<Verdict, RuntimeError> {
        let process = match program.launch(self.spawner).await {
            Ok(p) => p,
            Err(e) => {
                self.ledger.drain_all(EvictReason::Drain).await;
                return Err(RuntimeError::Launch(e));
            }
        };

        let ctx = AttemptContext {
            cfg: self.cfg,
            ledger: self.ledger.as_ref(),
            backend: self.backend.as_ref(),
            injector: self.injector.map(|i| i.as_ref()),
            bus: self.bus,
        };

        let mut state = State::Supervising {
            process,
            restored_from: None,
        };
        let verdict = loop {
            state = match state {
                State::Supervising {
                    process,
                    restored_from,
                } => match supervise(process, restored_from, &ctx, stats).await {
                    Ok(()) => State::Finalize(Verdict::Success),
                    Err(e) => State::Failed(e),
                },
                State::Failed(err) => match self.select_checkpoint().await {
                    None => {
                        self.bus.publish(Event::new(EventKind::BackupsExhausted));
                        State::Finalize(Verdict::Failure)
                    }
                    Some(record) => match self.restore(&record, stats).await {
                        Ok(process) => State::Supervising {
                            process,
                            restored_from: Some(record.sequence()),
                        },
                        Err(source) => match self.cfg.restore_failure {
                            RestoreFailurePolicy::Abort => {
                                self.ledger.drain_all(EvictReason::Drain).await;
                                return Err(RuntimeError::RestoreFailed {
                                    checkpoint: record.sequence(),
                                    source,
                                });
                            }
                            RestoreFailurePolicy::Fallback => {
                                self.ledger
                                    .evict(record.sequence(), EvictReason::RestoreFailed)
                                    .await;
                                State::Failed(err)
                            }
                        },
                    },
                },
                State::Finalize(verdict) => break verdict,
            };
        };

        self.ledger.drain_all(EvictReason::Drain).await;
        Ok(verdict)
    }

    /// Picks the newest record with retry budget left, evicting exhausted ones.
    ///
    /// The returned record already has its retry count incremented.
    async fn select_checkpoint(&self) -> Option<CheckpointRecord> {
        loop {
            let newest = self.ledger.newest().await?;
            if newest.retries() >= self.cfg.retry_limit {
                self.ledger
                    .evict(newest.sequence(), EvictReason::RetriesExhausted)
                    .await;
                continue;
            }
            if let Some(record) = self.ledger.record_retry(newest.sequence()).await {
                return Some(record);
            }
        }
    }

    async fn restore(
        &self,
        record: &CheckpointRecord,
        stats: &Stats,
    ) -> Result<RunningProcess, BackendError> {
        self.bus.publish(
            Event::new(EventKind::RestoreScheduled)
                .with_checkpoint(record.sequence())
                .with_artifact(record.artifact().to_string())
                .with_retries(record.retries())
                .with_attempt(stats.attempts() + 1),
        );

        self.backend
            .restore(record.artifact(), self.spawner)
            .await
            .inspect_err(|err| {
                self.bus.publish(
                    Event::new(EventKind::RestoreFailed)
                        .with_checkpoint(record.sequence())
                        .with_artifact(record.artifact().to_string())
                        .with_reason(err.to_string()),
                );
            })
    }
}
