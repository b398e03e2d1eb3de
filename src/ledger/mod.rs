//! # Checkpoint ledger with bounded retention.
//!
//! [`CheckpointLedger`] keeps the live [`CheckpointRecord`]s of one run, oldest
//! first. It owns artifact deletion: every record that leaves the ledger has
//! its artifact discarded through the [`CheckpointBackend`].
//!
//! ## Rules
//! - Size never exceeds the configured capacity; the oldest record is evicted first.
//! - Sequence numbers start at 1, strictly increase and are never reused.
//! - A record is removed under the lock and its artifact deleted after the lock
//!   is released, so no artifact is deleted twice even when [`drain_all`]
//!   races itself (normal finalization vs. emergency cleanup).
//! - Deletion failures are published as [`EventKind::ArtifactRemoveFailed`] and
//!   never abort the operation.
//! - An artifact being written ([`reserve`]d but not yet appended) is also
//!   deleted by [`drain_all`], so an interrupted checkpoint leaves no file behind.
//!
//! ```text
//! append(a4), capacity = 3
//!   [#1 #2 #3] ──► [#1 #2 #3 #4] ──► evict #1 ──► [#2 #3 #4]
//!
//! recovery
//!   newest() = #4 ─► retries < limit ─► record_retry(#4) ─► restore
//!                └─► retries = limit ─► evict(#4) ─► newest() = #3 ...
//! ```
//!
//! [`drain_all`]: CheckpointLedger::drain_all
//! [`reserve`]: CheckpointLedger::reserve

mod record;

pub use record::{Artifact, CheckpointRecord, EvictReason};

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backends::CheckpointBackend;
use crate::events::{Bus, Event, EventKind};

struct LedgerState {
    records: VecDeque<CheckpointRecord>,
    next_sequence: u64,
    in_flight: Option<Artifact>,
}

/// Ordered, bounded collection of live checkpoints.
pub struct CheckpointLedger {
    state: Mutex<LedgerState>,
    capacity: usize,
    store: Arc<dyn CheckpointBackend>,
    bus: Bus,
}

impl CheckpointLedger {
    /// Creates an empty ledger holding at most `capacity` (min 1) records.
    pub fn new(capacity: usize, store: Arc<dyn CheckpointBackend>, bus: Bus) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                records: VecDeque::new(),
                next_sequence: 1,
                in_flight: None,
            }),
            capacity: capacity.max(1),
            store,
            bus,
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sequence number the next [`append`](Self::append) will assign.
    pub async fn next_sequence(&self) -> u64 {
        self.state.lock().await.next_sequence
    }

    /// Names the artifact of the next checkpoint of `pid` and tracks it as in flight.
    ///
    /// Until it is [`append`](Self::append)ed or [`release`](Self::release)d,
    /// the artifact is deleted by [`drain_all`](Self::drain_all).
    pub async fn reserve(&self, dir: impl AsRef<Path>, pid: u32) -> Artifact {
        let mut state = self.state.lock().await;
        let artifact = Artifact::new(dir, state.next_sequence, pid);
        state.in_flight = Some(artifact.clone());
        artifact
    }

    /// Stops tracking `artifact` as in flight (the checkpoint was not taken).
    pub async fn release(&self, artifact: &Artifact) {
        let mut state = self.state.lock().await;
        if state.in_flight.as_ref() == Some(artifact) {
            state.in_flight = None;
        }
    }

    /// Appends a record for `artifact`, evicting the oldest records beyond capacity.
    pub async fn append(&self, artifact: Artifact) -> CheckpointRecord {
        let (record, evicted) = {
            let mut state = self.state.lock().await;
            if state.in_flight.as_ref() == Some(&artifact) {
                state.in_flight = None;
            }
            let record = CheckpointRecord {
                sequence: state.next_sequence,
                artifact,
                retries: 0,
            };
            state.next_sequence += 1;
            state.records.push_back(record.clone());

            let mut evicted = Vec::new();
            while state.records.len() > self.capacity {
                if let Some(oldest) = state.records.pop_front() {
                    evicted.push(oldest);
                }
            }
            (record, evicted)
        };

        for old in &evicted {
            self.discard(old, EvictReason::Capacity).await;
        }
        record
    }

    /// Newest record, if any.
    pub async fn newest(&self) -> Option<CheckpointRecord> {
        self.state.lock().await.records.back().cloned()
    }

    /// Increments the retry count of record `sequence` and returns the updated record.
    ///
    /// Returns `None` when the record is no longer in the ledger.
    pub async fn record_retry(&self, sequence: u64) -> Option<CheckpointRecord> {
        let mut state = self.state.lock().await;
        let record = state.records.iter_mut().find(|r| r.sequence == sequence)?;
        record.retries += 1;
        Some(record.clone())
    }

    /// Removes record `sequence` and deletes its artifact.
    ///
    /// Returns `false` when the record was already gone.
    pub async fn evict(&self, sequence: u64, reason: EvictReason) -> bool {
        let removed = {
            let mut state = self.state.lock().await;
            state
                .records
                .iter()
                .position(|r| r.sequence == sequence)
                .and_then(|idx| state.records.remove(idx))
        };
        match removed {
            Some(record) => {
                self.discard(&record, reason).await;
                true
            }
            None => false,
        }
    }

    /// Removes every record and deletes its artifact, oldest first.
    ///
    /// An in-flight artifact is deleted too, without counting as a record.
    /// Safe to call concurrently with itself. Returns the number of records this call removed.
    pub async fn drain_all(&self, reason: EvictReason) -> usize {
        let in_flight = {
            let mut state = self.state.lock().await;
            let sequence = state.next_sequence;
            state.in_flight.take().map(|a| (sequence, a))
        };
        if let Some((sequence, artifact)) = in_flight {
            self.discard_artifact(sequence, &artifact, reason).await;
        }

        let mut drained = 0;
        loop {
            let next = self.state.lock().await.records.pop_front();
            let Some(record) = next else {
                return drained;
            };
            self.discard(&record, reason).await;
            drained += 1;
        }
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    /// True when no checkpoint is available.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.records.is_empty()
    }

    /// Copy of the live records, oldest first.
    pub async fn records(&self) -> Vec<CheckpointRecord> {
        self.state.lock().await.records.iter().cloned().collect()
    }

    async fn discard(&self, record: &CheckpointRecord, reason: EvictReason) {
        self.discard_artifact(record.sequence, &record.artifact, reason)
            .await;
    }

    async fn discard_artifact(&self, sequence: u64, artifact: &Artifact, reason: EvictReason) {
        let ev = match self.store.discard(artifact).await {
            Ok(()) => Event::new(EventKind::CheckpointEvicted).with_reason(reason.as_str()),
            Err(err) => Event::new(EventKind::ArtifactRemoveFailed).with_reason(err.to_string()),
        };
        self.bus
            .publish(ev.with_checkpoint(sequence).with_artifact(artifact.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn ledger(capacity: usize) -> (CheckpointLedger, Arc<FakeBackend>) {
        let store = Arc::new(FakeBackend::new());
        let ledger = CheckpointLedger::new(capacity, store.clone(), Bus::new(64));
        (ledger, store)
    }

    async fn take(ledger: &CheckpointLedger, store: &FakeBackend, pid: u32) -> CheckpointRecord {
        let artifact = Artifact::new("/ckpt", ledger.next_sequence().await, pid);
        store.materialize(&artifact);
        ledger.append(artifact).await
    }

    #[tokio::test]
    async fn capacity_one_keeps_only_latest_checkpoint() {
        let (ledger, store) = ledger(1);
        for _ in 0..3 {
            take(&ledger, &store, 10).await;
        }

        let records = ledger.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sequence(), 3);
        assert_eq!(store.discarded(), vec!["/ckpt/1.10", "/ckpt/2.10"]);
        assert_eq!(store.live(), vec!["/ckpt/3.10"]);
    }

    #[tokio::test]
    async fn size_never_exceeds_capacity_and_oldest_goes_first() {
        let (ledger, store) = ledger(3);
        for n in 1..=10u64 {
            take(&ledger, &store, 1).await;
            assert!(ledger.len().await <= 3);
            let first = ledger.records().await[0].sequence();
            assert_eq!(first, n.saturating_sub(2).max(1));
        }
    }

    #[tokio::test]
    async fn sequences_are_not_reused_after_eviction() {
        let (ledger, store) = ledger(2);
        let a = take(&ledger, &store, 1).await;
        let b = take(&ledger, &store, 1).await;
        assert!(ledger.evict(b.sequence(), EvictReason::RetriesExhausted).await);
        let c = take(&ledger, &store, 1).await;

        assert_eq!((a.sequence(), b.sequence(), c.sequence()), (1, 2, 3));
        assert_eq!(ledger.newest().await.map(|r| r.sequence()), Some(3));
    }

    #[tokio::test]
    async fn record_retry_counts_on_the_chosen_record() {
        let (ledger, store) = ledger(2);
        let rec = take(&ledger, &store, 1).await;
        assert_eq!(ledger.record_retry(rec.sequence()).await.map(|r| r.retries()), Some(1));
        assert_eq!(ledger.record_retry(rec.sequence()).await.map(|r| r.retries()), Some(2));
        assert_eq!(ledger.record_retry(99).await, None);
    }

    #[tokio::test]
    async fn evicting_a_missing_record_is_a_noop() {
        let (ledger, store) = ledger(2);
        let rec = take(&ledger, &store, 1).await;
        assert!(ledger.evict(rec.sequence(), EvictReason::Drain).await);
        assert!(!ledger.evict(rec.sequence(), EvictReason::Drain).await);
        assert_eq!(store.discarded().len(), 1);
    }

    #[tokio::test]
    async fn drain_continues_past_removal_failures() {
        let (ledger, store) = ledger(3);
        let mut rx = ledger.bus.subscribe();
        take(&ledger, &store, 1).await;
        let second = Artifact::new("/ckpt", ledger.next_sequence().await, 1);
        // never materialized: the fake store reports a removal error
        ledger.append(second).await;
        take(&ledger, &store, 1).await;

        assert_eq!(ledger.drain_all(EvictReason::Drain).await, 3);
        assert!(ledger.is_empty().await);
        assert!(store.live().is_empty());

        let mut failures = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::ArtifactRemoveFailed {
                assert_eq!(ev.checkpoint, Some(2));
                failures += 1;
            }
        }
        assert_eq!(failures, 1);
    }

    #[tokio::test]
    async fn concurrent_drains_delete_each_artifact_once() {
        let (ledger, store) = ledger(8);
        for _ in 0..8 {
            take(&ledger, &store, 1).await;
        }

        let (a, b) = tokio::join!(
            ledger.drain_all(EvictReason::Drain),
            ledger.drain_all(EvictReason::Terminated)
        );
        assert_eq!(a + b, 8);
        assert_eq!(store.discarded().len(), 8);
        assert_eq!(store.remove_errors(), 0);
    }

    #[tokio::test]
    async fn drain_deletes_the_artifact_being_written() {
        let (ledger, store) = ledger(2);
        take(&ledger, &store, 7).await;
        let writing = ledger.reserve("/ckpt", 7).await;
        assert_eq!(writing.path(), std::path::Path::new("/ckpt/2.7"));
        store.materialize(&writing);

        assert_eq!(ledger.drain_all(EvictReason::Terminated).await, 1);
        assert!(store.live().is_empty());
        assert_eq!(store.discarded(), vec!["/ckpt/2.7", "/ckpt/1.7"]);

        assert_eq!(ledger.drain_all(EvictReason::Terminated).await, 0);
        assert_eq!(store.discarded().len(), 2);
    }

    #[tokio::test]
    async fn appended_or_released_artifacts_are_no_longer_in_flight() {
        let (ledger, store) = ledger(2);
        let kept = ledger.reserve("/ckpt", 1).await;
        store.materialize(&kept);
        ledger.append(kept).await;

        let failed = ledger.reserve("/ckpt", 1).await;
        assert_eq!(failed.path(), std::path::Path::new("/ckpt/2.1"));
        ledger.release(&failed).await;

        assert_eq!(ledger.drain_all(EvictReason::Drain).await, 1);
        assert_eq!(store.discarded(), vec!["/ckpt/1.1"]);
        assert_eq!(store.remove_errors(), 0);
    }
}
