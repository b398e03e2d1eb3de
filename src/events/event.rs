//! # Runtime events emitted by the supervision loop, the recovery controller and the ledger.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Process events**: start, output lines, clean exit, abnormal exit
//! - **Checkpoint events**: taken, failed, evicted, artifact removal failures
//! - **Fault events**: injected, failed, disabled for the run
//! - **Recovery / lifecycle events**: restores, exhaustion, early termination
//!
//! The [`Event`] struct carries metadata such as timestamps, pid, checkpoint
//! sequence number, artifact and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use faultvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::CheckpointTaken)
//!     .with_pid(4242)
//!     .with_checkpoint(3)
//!     .with_artifact("3.4242");
//!
//! assert_eq!(ev.kind, EventKind::CheckpointTaken);
//! assert_eq!(ev.checkpoint, Some(3));
//! assert_eq!(ev.artifact.as_deref(), Some("3.4242"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Process events ===
    /// A process instance started (original launch or restore).
    ///
    /// Sets: `pid`, `attempt`, `checkpoint` (restores only)
    ProcessStarted,

    /// One line of child output.
    ///
    /// Sets: `pid`, `stream`, `reason` (the line)
    ProcessOutput,

    /// The process exited cleanly.
    ///
    /// Sets: `pid`, `attempt`
    ProcessExited,

    /// The process ended abnormally.
    ///
    /// Sets: `pid`, `attempt`, `reason`
    ProcessFailed,

    // === Checkpoint events ===
    /// A checkpoint was taken and appended to the ledger.
    ///
    /// Sets: `pid`, `checkpoint`, `artifact`, `elapsed_ms`
    CheckpointTaken,

    /// The checkpoint backend failed; the process keeps running.
    ///
    /// Sets: `pid`, `reason`, `elapsed_ms`
    CheckpointFailed,

    /// A record left the ledger and its artifact was deleted.
    ///
    /// Sets: `checkpoint`, `artifact`, `reason` (capacity / retries / drain / restore)
    CheckpointEvicted,

    /// Deleting an artifact failed; it must be removed manually.
    ///
    /// Sets: `checkpoint`, `artifact`, `reason`
    ArtifactRemoveFailed,

    // === Fault events ===
    /// A fault was injected.
    ///
    /// Sets: `pid`, `reason` (backend description), `elapsed_ms`
    FaultInjected,

    /// The fault-injection backend failed for this tick.
    ///
    /// Sets: `pid`, `reason`, `elapsed_ms`
    FaultFailed,

    /// Fault injection is disabled for the whole run (backend unavailable).
    ///
    /// Sets: `reason`
    FaultInjectionDisabled,

    // === Recovery events ===
    /// Recovery picked a checkpoint and is about to restore it.
    ///
    /// Sets: `checkpoint`, `artifact`, `retries` (after increment), `attempt`
    RestoreScheduled,

    /// The backend could not restore a checkpoint.
    ///
    /// Sets: `checkpoint`, `artifact`, `reason`
    RestoreFailed,

    /// No usable checkpoint is left; the run fails.
    BackupsExhausted,

    // === Lifecycle events ===
    /// Termination signal observed.
    ///
    /// Sets: `reason`
    ShutdownRequested,

    /// The configured run deadline elapsed.
    ///
    /// Sets: `elapsed_ms` (the deadline)
    DeadlineExceeded,
}

/// Which pipe a relayed output line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    /// Tag used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Supervised process id.
    pub pid: Option<u32>,
    /// Supervision attempt (1 = original launch).
    pub attempt: Option<u32>,
    /// Checkpoint sequence number.
    pub checkpoint: Option<u64>,
    /// Checkpoint artifact name.
    pub artifact: Option<Arc<str>>,
    /// Retry count of a checkpoint record.
    pub retries: Option<u32>,
    /// Output stream of a relayed line.
    pub stream: Option<OutputStream>,
    /// Duration of the operation in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Human-readable reason (errors, descriptions, output lines).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            pid: None,
            attempt: None,
            checkpoint: None,
            artifact: None,
            retries: None,
            stream: None,
            elapsed_ms: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a supervision attempt number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a checkpoint sequence number.
    #[inline]
    pub fn with_checkpoint(mut self, seq: u64) -> Self {
        self.checkpoint = Some(seq);
        self
    }

    /// Attaches an artifact name.
    #[inline]
    pub fn with_artifact(mut self, artifact: impl Into<Arc<str>>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }

    /// Attaches a retry count.
    #[inline]
    pub fn with_retries(mut self, n: u32) -> Self {
        self.retries = Some(n);
        self
    }

    /// Attaches an output stream tag.
    #[inline]
    pub fn with_stream(mut self, stream: OutputStream) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Attaches an operation duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }
}
