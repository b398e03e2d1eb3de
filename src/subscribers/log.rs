//! # LogWriter: event to `tracing` bridge
//!
//! Renders every [`Event`] as a structured `tracing` record. The binary installs
//! a `tracing_subscriber` formatter; library users can route the records anywhere.
//!
//! ## Example output
//! ```text
//! INFO process started pid=4242 attempt=1
//! INFO checkpoint taken pid=4242 checkpoint=1 artifact="1.4242" elapsed_ms=12
//! INFO fault injected pid=4242 elapsed_ms=0 description="flipped bit 3 of rax"
//! WARN process failed pid=4242 attempt=1 reason="exited abnormally (code=Some(139), signal=None)"
//! INFO restoring checkpoint checkpoint=1 retries=1 attempt=2
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or("");
        let artifact = e.artifact.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ProcessStarted => {
                info!(pid = e.pid, attempt = e.attempt, checkpoint = e.checkpoint, "process started");
            }
            EventKind::ProcessOutput => {
                let stream = e.stream.map(|s| s.as_str()).unwrap_or("?");
                info!(target: "faultvisor::child", stream, "{reason}");
            }
            EventKind::ProcessExited => {
                info!(pid = e.pid, attempt = e.attempt, "process exited cleanly");
            }
            EventKind::ProcessFailed => {
                warn!(pid = e.pid, attempt = e.attempt, reason, "process failed");
            }
            EventKind::CheckpointTaken => {
                info!(
                    pid = e.pid,
                    checkpoint = e.checkpoint,
                    artifact,
                    elapsed_ms = e.elapsed_ms,
                    "checkpoint taken"
                );
            }
            EventKind::CheckpointFailed => {
                warn!(pid = e.pid, elapsed_ms = e.elapsed_ms, reason, "checkpoint failed");
            }
            EventKind::CheckpointEvicted => {
                info!(checkpoint = e.checkpoint, artifact, reason, "checkpoint evicted");
            }
            EventKind::ArtifactRemoveFailed => {
                error!(
                    checkpoint = e.checkpoint,
                    artifact,
                    reason,
                    "could not remove artifact, please delete it manually"
                );
            }
            EventKind::FaultInjected => {
                info!(pid = e.pid, elapsed_ms = e.elapsed_ms, description = reason, "fault injected");
            }
            EventKind::FaultFailed => {
                warn!(pid = e.pid, elapsed_ms = e.elapsed_ms, reason, "fault injection failed");
            }
            EventKind::FaultInjectionDisabled => {
                warn!(reason, "fault injection disabled for this run");
            }
            EventKind::RestoreScheduled => {
                info!(
                    checkpoint = e.checkpoint,
                    artifact,
                    retries = e.retries,
                    attempt = e.attempt,
                    "restoring checkpoint"
                );
            }
            EventKind::RestoreFailed => {
                error!(checkpoint = e.checkpoint, artifact, reason, "restore failed");
            }
            EventKind::BackupsExhausted => {
                error!("no backups left to restore from");
            }
            EventKind::ShutdownRequested => {
                warn!(reason, "terminating early, deleting all checkpoints");
            }
            EventKind::DeadlineExceeded => {
                warn!(deadline_ms = e.elapsed_ms, "deadline exceeded, deleting all checkpoints");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
