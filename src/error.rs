//! Error types used by the faultvisor runtime, its backends and supervised processes.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: errors that abort a whole run.
//! - [`AbortedRun`]: a [`RuntimeError`] together with the report of the run it ended.
//! - [`BackendError`]: failures of a single checkpoint, restore, fault-injection or
//!   artifact-removal call. These are logged and never escape the supervision loop.
//! - [`ProcessError`]: how a supervised process ended when it did not exit cleanly.
//!
//! All types provide `as_label` for logs.

use thiserror::Error;

use crate::stats::RunReport;

/// # Errors that abort a run.
///
/// The ledger is always drained before one of these is returned.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The original program could not be started.
    #[error("failed to launch program: {0}")]
    Launch(#[from] ProcessError),

    /// Restoring from a checkpoint failed and the configured policy is to abort.
    #[error("restore from checkpoint #{checkpoint} failed: {source}")]
    RestoreFailed {
        /// Sequence number of the checkpoint that could not be restored.
        checkpoint: u64,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use faultvisor::{ProcessError, RuntimeError};
    ///
    /// let err = RuntimeError::Launch(ProcessError::Spawn { reason: "no such file".into() });
    /// assert_eq!(err.as_label(), "runtime_launch");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Launch(_) => "runtime_launch",
            RuntimeError::RestoreFailed { .. } => "runtime_restore_failed",
        }
    }
}

/// # A run that ended with a [`RuntimeError`].
///
/// `report` covers everything up to the abort; its verdict is
/// [`Verdict::Failure`](crate::Verdict::Failure).
#[derive(Error, Debug)]
#[error("{error}")]
pub struct AbortedRun {
    /// Why the run was aborted.
    #[source]
    pub error: RuntimeError,
    /// Attempts, counters and timing collected before the abort.
    pub report: RunReport,
}

/// # Failures of an external checkpoint or fault-injection facility.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BackendError {
    /// The facility is not present on this host.
    #[error("backend unavailable: {reason}")]
    Unavailable {
        /// What is missing.
        reason: String,
    },

    /// Taking a checkpoint failed.
    #[error("checkpoint failed: {reason}")]
    Checkpoint {
        /// Backend diagnostic.
        reason: String,
    },

    /// Resuming a process from an artifact failed.
    #[error("restore failed: {reason}")]
    Restore {
        /// Backend diagnostic.
        reason: String,
    },

    /// Injecting a fault failed.
    #[error("fault injection failed: {reason}")]
    Inject {
        /// Backend diagnostic.
        reason: String,
    },

    /// Deleting an artifact failed.
    #[error("failed to remove artifact '{artifact}': {reason}")]
    Remove {
        /// Artifact that is left behind and must be deleted manually.
        artifact: String,
        /// Backend diagnostic.
        reason: String,
    },

    /// I/O failure talking to the facility.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use faultvisor::BackendError;
    ///
    /// let err = BackendError::Inject { reason: "see dmesg".into() };
    /// assert_eq!(err.as_label(), "backend_inject");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BackendError::Unavailable { .. } => "backend_unavailable",
            BackendError::Checkpoint { .. } => "backend_checkpoint",
            BackendError::Restore { .. } => "backend_restore",
            BackendError::Inject { .. } => "backend_inject",
            BackendError::Remove { .. } => "backend_remove",
            BackendError::Io(_) => "backend_io",
        }
    }
}

/// # Abnormal end of a supervised process.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// The process could not be started.
    #[error("spawn failed: {reason}")]
    Spawn {
        /// OS diagnostic.
        reason: String,
    },

    /// The process terminated with a non-zero status or was killed by a signal.
    #[error("exited abnormally (code={code:?}, signal={signal:?})")]
    Exited {
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Terminating signal number (unix only).
        signal: Option<i32>,
    },

    /// Waiting for the process failed.
    #[error("wait failed: {reason}")]
    Wait {
        /// OS or runtime diagnostic.
        reason: String,
    },
}

impl ProcessError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::Spawn { .. } => "process_spawn",
            ProcessError::Exited { .. } => "process_exited",
            ProcessError::Wait { .. } => "process_wait",
        }
    }

    /// Builds an `Exited` error from a non-successful status.
    pub(crate) fn from_status(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        ProcessError::Exited {
            code: status.code(),
            signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = RuntimeError::RestoreFailed {
            checkpoint: 3,
            source: BackendError::Restore {
                reason: "corrupt".into(),
            },
        };
        assert_eq!(err.as_label(), "runtime_restore_failed");
        assert_eq!(
            ProcessError::Exited {
                code: Some(1),
                signal: None
            }
            .as_label(),
            "process_exited"
        );
    }

    #[test]
    fn restore_failure_message_names_checkpoint() {
        let err = RuntimeError::RestoreFailed {
            checkpoint: 7,
            source: BackendError::Restore {
                reason: "bad image".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "restore from checkpoint #7 failed: restore failed: bad image"
        );
    }
}
