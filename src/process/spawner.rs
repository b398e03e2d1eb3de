//! # Starting OS children with relayed output.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::RunningProcess;
use crate::error::ProcessError;
use crate::events::{Bus, Event, EventKind, OutputStream};

/// Starts children whose stdout/stderr lines are published on the [`Bus`].
#[derive(Clone, Debug)]
pub struct Spawner {
    bus: Bus,
}

impl Spawner {
    /// Creates a spawner publishing output to `bus`.
    pub fn new(bus: Bus) -> Self {
        Self { bus }
    }

    /// Spawns `cmd`.
    ///
    /// Stdin is closed, stdout/stderr are piped and relayed line by line.
    /// One waiter task owns the child; dropping the returned handle kills it.
    pub fn spawn(&self, cmd: Command) -> Result<RunningProcess, ProcessError> {
        self.spawn_inner(cmd, None)
    }

    /// Spawns a restorer `cmd` that brings `resumed_pid` back to life.
    ///
    /// The handle reports `resumed_pid`. Dropping it sends `SIGKILL` to
    /// `resumed_pid` before killing the restorer itself.
    pub fn spawn_resumer(
        &self,
        cmd: Command,
        resumed_pid: u32,
    ) -> Result<RunningProcess, ProcessError> {
        self.spawn_inner(cmd, Some(resumed_pid))
    }

    fn spawn_inner(
        &self,
        mut cmd: Command,
        resumed: Option<u32>,
    ) -> Result<RunningProcess, ProcessError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| ProcessError::Spawn {
            reason: e.to_string(),
        })?;
        let child_pid = child.id().ok_or_else(|| ProcessError::Spawn {
            reason: "failed to get process ID".to_string(),
        })?;
        let pid = resumed.unwrap_or(child_pid);

        if let Some(out) = child.stdout.take() {
            tokio::spawn(relay(out, OutputStream::Stdout, pid, self.bus.clone()));
        }
        if let Some(err) = child.stderr.take() {
            tokio::spawn(relay(err, OutputStream::Stderr, pid, self.bus.clone()));
        }

        let kill = CancellationToken::new();
        let killed = kill.clone();
        let waiter = tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => Some(status),
                _ = killed.cancelled() => None,
            };
            match status {
                Some(status) => status,
                None => {
                    if let Some(pid) = resumed {
                        kill_resumed(pid);
                    }
                    let _ = child.start_kill();
                    child.wait().await
                }
            }
        });

        let exit = async move {
            match waiter.await {
                Ok(Ok(status)) if status.success() => Ok(()),
                Ok(Ok(status)) => Err(ProcessError::from_status(status)),
                Ok(Err(e)) => Err(ProcessError::Wait {
                    reason: e.to_string(),
                }),
                Err(join) => Err(ProcessError::Wait {
                    reason: join.to_string(),
                }),
            }
        };

        Ok(RunningProcess::from_future(pid, exit).with_kill_guard(kill.drop_guard()))
    }
}

#[cfg(unix)]
fn kill_resumed(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        warn!(pid, "resumed pid out of range, not signalled");
        return;
    };
    match kill(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => warn!(pid, "failed to kill resumed process: {e}"),
    }
}

#[cfg(not(unix))]
fn kill_resumed(pid: u32) {
    warn!(pid, "resumed process cannot be signalled on this platform");
}

/// Publishes each line of `reader` until end of stream.
///
/// Bytes are decoded lossily. The pipe is drained to the end even after a read
/// error, so the child never sees a closed pipe.
async fn relay<R>(reader: R, stream: OutputStream, pid: u32, bus: Bus)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return,
            Ok(_) => bus.publish(
                Event::new(EventKind::ProcessOutput)
                    .with_pid(pid)
                    .with_stream(stream)
                    .with_reason(String::from_utf8_lossy(trim_newline(&buf)).into_owned()),
            ),
            Err(e) => {
                warn!(pid, %stream, "output relay stopped, discarding the rest: {e}");
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                return;
            }
        }
    }
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
