//! # Early termination: OS signals and the run deadline.
//!
//! [`wait_for_termination`] completes when the process receives a termination
//! signal or when the optional deadline elapses, whichever comes first.
//!
//! ## Signals
//! **Unix platforms:** `SIGINT` (Ctrl-C), `SIGTERM`, `SIGQUIT`
//!
//! **Windows platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! If signal registration fails the failure is logged and only the deadline
//! (if any) can end the run early.

use std::fmt;
use std::future::pending;
use std::time::Duration;

use tracing::warn;

/// Why a run was ended before reaching a verdict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Termination {
    /// An OS signal was received.
    Signal(&'static str),
    /// The configured deadline elapsed.
    Deadline(Duration),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Signal(name) => write!(f, "signal '{name}'"),
            Termination::Deadline(d) => write!(f, "deadline of {d:?} exceeded"),
        }
    }
}

/// Waits for a termination signal and returns its name.
///
/// Each call creates independent signal listeners.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for a termination signal and returns its name.
///
/// Each call creates independent signal listeners.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}

/// Waits for whichever of (termination signal, `deadline`) comes first.
pub async fn wait_for_termination(deadline: Option<Duration>) -> Termination {
    let signal = async {
        match wait_for_shutdown_signal().await {
            Ok(name) => Termination::Signal(name),
            Err(e) => {
                warn!("signal handlers unavailable: {e}");
                pending().await
            }
        }
    };

    match deadline {
        Some(d) => tokio::select! {
            why = signal => why,
            _ = tokio::time::sleep(d) => Termination::Deadline(d),
        },
        None => signal.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_without_signal() {
        let why = wait_for_termination(Some(Duration::from_secs(90))).await;
        assert_eq!(why, Termination::Deadline(Duration::from_secs(90)));
        assert_eq!(why.to_string(), "deadline of 90s exceeded");
    }

    #[tokio::test(start_paused = true)]
    async fn no_deadline_waits_for_signal_only() {
        let res = tokio::time::timeout(Duration::from_secs(3600), wait_for_termination(None)).await;
        assert!(res.is_err());
    }
}
