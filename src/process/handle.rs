//! # Handle to one running process instance.

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::DropGuard;

use crate::error::ProcessError;

/// A started process: its identifier and its exit as an awaitable event.
///
/// Dropping the handle terminates the process when it was started by a
/// [`Spawner`](crate::Spawner).
pub struct RunningProcess {
    pid: u32,
    exit: BoxFuture<'static, Result<(), ProcessError>>,
    _kill: Option<DropGuard>,
}

impl RunningProcess {
    /// Wraps an arbitrary exit future.
    ///
    /// # Example
    /// ```
    /// use faultvisor::{ProcessError, RunningProcess};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let mut p = RunningProcess::from_future(7, async { Ok::<(), ProcessError>(()) });
    /// assert_eq!(p.pid(), 7);
    /// assert!(p.wait().await.is_ok());
    /// # }
    /// ```
    pub fn from_future<F>(pid: u32, exit: F) -> Self
    where
        F: Future<Output = Result<(), ProcessError>> + Send + 'static,
    {
        Self {
            pid,
            exit: exit.boxed(),
            _kill: None,
        }
    }

    /// Attaches a guard that kills the process when the handle is dropped.
    pub(crate) fn with_kill_guard(mut self, guard: DropGuard) -> Self {
        self._kill = Some(guard);
        self
    }

    /// Process identifier used for checkpoint and fault-injection calls.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Waits for the process to end.
    ///
    /// Cancel-safe. Must not be awaited again once it has returned.
    pub async fn wait(&mut self) -> Result<(), ProcessError> {
        (&mut self.exit).await
    }
}

impl fmt::Debug for RunningProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningProcess").field("pid", &self.pid).finish()
    }
}
