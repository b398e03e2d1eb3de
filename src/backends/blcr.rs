//! # BLCR checkpoint backend.
//!
//! Checkpoints are taken with `cr_checkpoint -f <artifact> <pid>` and resumed
//! with `cr_restart -f <artifact>`. BLCR restores the original pid, so the
//! resumed process is reported under the pid recorded in the artifact name, and
//! that pid is killed along with `cr_restart` when the instance is dropped.
//! Programs must be started with the BLCR preload library
//! (see [`CommandSpec::with_preload`](crate::CommandSpec::with_preload)).

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use super::CheckpointBackend;
use crate::error::BackendError;
use crate::ledger::Artifact;
use crate::process::{RunningProcess, Spawner};

/// Checkpoint backend driving the BLCR command-line tools.
#[derive(Clone, Debug)]
pub struct BlcrBackend {
    checkpoint_bin: OsString,
    restart_bin: OsString,
}

impl Default for BlcrBackend {
    fn default() -> Self {
        Self {
            checkpoint_bin: "cr_checkpoint".into(),
            restart_bin: "cr_restart".into(),
        }
    }
}

impl BlcrBackend {
    /// Default location of the BLCR preload library.
    pub const DEFAULT_PRELOAD: &'static str = "/usr/local/lib/libcr_run.so.0";

    /// Uses `cr_checkpoint` and `cr_restart` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the tool locations.
    pub fn with_tools(checkpoint_bin: impl Into<OsString>, restart_bin: impl Into<OsString>) -> Self {
        Self {
            checkpoint_bin: checkpoint_bin.into(),
            restart_bin: restart_bin.into(),
        }
    }

    /// Default preload library path.
    pub fn preload_library() -> PathBuf {
        PathBuf::from(Self::DEFAULT_PRELOAD)
    }
}

#[async_trait]
impl CheckpointBackend for BlcrBackend {
    async fn checkpoint(&self, pid: u32, artifact: &Artifact) -> Result<(), BackendError> {
        let output = Command::new(&self.checkpoint_bin)
            .arg("-f")
            .arg(artifact.path())
            .arg(pid.to_string())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BackendError::Checkpoint {
                reason: format!("error running {:?}: {e}", self.checkpoint_bin),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(BackendError::Checkpoint {
                reason: format!("{}: {}", output.status, stderr.trim()),
            })
        }
    }

    async fn restore(
        &self,
        artifact: &Artifact,
        spawner: &Spawner,
    ) -> Result<RunningProcess, BackendError> {
        let mut cmd = Command::new(&self.restart_bin);
        cmd.arg("-f").arg(artifact.path());
        spawner
            .spawn_resumer(cmd, artifact.pid())
            .map_err(|e| BackendError::Restore {
                reason: e.to_string(),
            })
    }

    async fn discard(&self, artifact: &Artifact) -> Result<(), BackendError> {
        match tokio::fs::remove_file(artifact.path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackendError::Remove {
                artifact: artifact.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
