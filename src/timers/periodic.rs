//! # Fixed-rate checkpoint timer.
//!
//! A fresh [`CheckpointTimer`] is armed for every supervision attempt. After a
//! tick has been handled the loop calls [`CheckpointTimer::rearm`], so the next
//! deadline is always `now + period`, measured from the end of the checkpoint.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep};

/// Fixed-rate timer; silent when the period is `None`.
pub struct CheckpointTimer {
    period: Option<Duration>,
    sleep: Pin<Box<Sleep>>,
}

impl CheckpointTimer {
    /// Arms the timer to fire `period` from now.
    pub fn arm(period: Option<Duration>) -> Self {
        Self {
            period,
            sleep: Box::pin(sleep(period.unwrap_or(Duration::ZERO))),
        }
    }

    /// Completes when the current deadline is reached. Never completes when disabled.
    ///
    /// Cancel-safe: dropping the future keeps the deadline armed.
    pub async fn tick(&mut self) {
        match self.period {
            Some(_) => self.sleep.as_mut().await,
            None => pending().await,
        }
    }

    /// Moves the deadline to `now + period`.
    pub fn rearm(&mut self) {
        if let Some(period) = self.period {
            self.sleep.as_mut().reset(Instant::now() + period);
        }
    }

    /// True when a period is configured.
    pub fn is_enabled(&self) -> bool {
        self.period.is_some()
    }
}
