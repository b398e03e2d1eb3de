//! # Stochastic fault timer.
//!
//! [`PoissonTimer`] approximates a Poisson arrival process: each gap is drawn
//! independently from an exponential distribution with rate `1 / mean`, and the
//! next gap is drawn only after the previous fire was received by [`fired`]
//! (renewal process).
//!
//! ## Architecture
//! ```text
//! start(mean) ──► spawned draw loop
//!                   loop {
//!                     gap = ExponentialDelay::sample()
//!                     sleep(gap)            (cancellable)
//!                     tx.send(())           (cancellable) ──► fired()
//!                     delivered.notified()  (cancellable) ◄── fired() received it
//!                   }
//! stop() ──► CancellationToken::cancel()  (idempotent, non-blocking)
//! ```
//!
//! [`fired`]: PoissonTimer::fired

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

/// Exponential distribution sampler using inverse-transform sampling.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use rand::{SeedableRng, rngs::StdRng};
/// use faultvisor::ExponentialDelay;
///
/// let dist = ExponentialDelay::new(Duration::from_secs(1));
/// let mut rng = StdRng::seed_from_u64(7);
/// let gap = dist.sample(&mut rng);
/// assert!(gap < Duration::from_secs(3600));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ExponentialDelay {
    mean: Duration,
}

impl ExponentialDelay {
    /// Creates a sampler with the given mean (`1 / rate`).
    pub fn new(mean: Duration) -> Self {
        Self { mean }
    }

    /// Returns the configured mean.
    pub fn mean(&self) -> Duration {
        self.mean
    }

    /// Draws one gap: `mean * ln(1 / (1 - u))` with `u` uniform in `[0, 1)`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let u: f64 = rng.random();
        let secs = self.mean.as_secs_f64() * (1.0 / (1.0 - u)).ln();
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Renewal-process timer; silent when no mean is configured.
pub struct PoissonTimer {
    fires: Option<mpsc::Receiver<()>>,
    delivered: Arc<Notify>,
    stop: CancellationToken,
}

impl PoissonTimer {
    /// Starts the draw loop, or a silent timer when `mean` is `None`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(mean: Option<Duration>) -> Self {
        Self::start_with_rng(mean, StdRng::from_rng(&mut rand::rng()))
    }

    /// Same as [`PoissonTimer::start`] with an explicit random source.
    pub fn start_with_rng(mean: Option<Duration>, mut rng: StdRng) -> Self {
        let stop = CancellationToken::new();
        let delivered = Arc::new(Notify::new());
        let Some(mean) = mean.filter(|m| *m > Duration::ZERO) else {
            return Self {
                fires: None,
                delivered,
                stop,
            };
        };

        let (tx, rx) = mpsc::channel::<()>(1);
        let token = stop.clone();
        let received = Arc::clone(&delivered);
        let dist = ExponentialDelay::new(mean);
        tokio::spawn(async move {
            loop {
                let gap = dist.sample(&mut rng);
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(gap) => {}
                }
                tokio::select! {
                    _ = token.cancelled() => return,
                    sent = tx.send(()) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = received.notified() => {}
                }
            }
        });

        Self {
            fires: Some(rx),
            delivered,
            stop,
        }
    }

    /// Completes on the next fire. Never completes when disabled or stopped.
    ///
    /// The gap to the following fire starts when this returns. Cancel-safe.
    pub async fn fired(&mut self) {
        match self.fires.as_mut() {
            Some(rx) => {
                if rx.recv().await.is_none() {
                    self.fires = None;
                    pending::<()>().await;
                }
                self.delivered.notify_one();
            }
            None => pending().await,
        }
    }

    /// Stops the draw loop and discards any pending fire.
    pub fn stop(&mut self) {
        self.stop.cancel();
        self.fires = None;
    }

    /// True while the timer can still fire.
    pub fn is_active(&self) -> bool {
        self.fires.is_some()
    }
}

impl Drop for PoissonTimer {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Instant, timeout};

    #[test]
    fn sample_mean_approximates_configured_mean() {
        let dist = ExponentialDelay::new(Duration::from_millis(500));
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let n = 200_000;

        let samples: Vec<f64> = (0..n).map(|_| dist.sample(&mut rng).as_secs_f64()).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        assert!((mean - 0.5).abs() < 0.01, "mean {mean}");

        // Exponential CDF at the mean is 1 - 1/e.
        let below = samples.iter().filter(|s| **s <= 0.5).count() as f64 / n as f64;
        let expected = 1.0 - (-1.0f64).exp();
        assert!((below - expected).abs() < 0.01, "P(X <= mean) = {below}");

        // Memorylessness shows up as a standard deviation equal to the mean.
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((var.sqrt() - 0.5).abs() < 0.02, "stddev {}", var.sqrt());
    }

    #[test]
    fn samples_are_never_negative() {
        let dist = ExponentialDelay::new(Duration::from_secs(1));
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10_000 {
            assert!(dist.sample(&mut rng) >= Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_timer_never_fires() {
        let mut timer = PoissonTimer::start(None);
        assert!(!timer.is_active());
        assert!(timeout(Duration::from_secs(24 * 3600), timer.fired()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fires_repeatedly_until_stopped() {
        let mut timer =
            PoissonTimer::start_with_rng(Some(Duration::from_millis(100)), StdRng::seed_from_u64(3));
        let start = Instant::now();
        for _ in 0..20 {
            timer.fired().await;
        }
        assert!(start.elapsed() > Duration::ZERO);

        timer.stop();
        timer.stop();
        assert!(!timer.is_active());
        assert!(timeout(Duration::from_secs(3600), timer.fired()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn next_gap_starts_when_the_fire_is_received() {
        let mean = Some(Duration::from_millis(100));
        let dist = ExponentialDelay::new(Duration::from_millis(100));
        let mut draws = StdRng::seed_from_u64(11);
        let first = dist.sample(&mut draws);
        let second = dist.sample(&mut draws);

        let mut timer = PoissonTimer::start_with_rng(mean, StdRng::seed_from_u64(11));
        // busy consumer: the first fire waits long past its due time
        tokio::time::sleep(first + Duration::from_secs(100)).await;
        timer.fired().await;

        let received = Instant::now();
        timer.fired().await;
        let gap = received.elapsed();
        assert!(gap >= second, "gap {gap:?} shorter than drawn {second:?}");
        assert!(gap <= second + Duration::from_millis(2), "gap {gap:?}");
    }
}
