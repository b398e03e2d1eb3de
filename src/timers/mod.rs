//! Event sources driving the supervision loop.
//!
//! ## Contents
//! - [`PoissonTimer`] renewal process with exponentially distributed gaps (fault injection)
//! - [`ExponentialDelay`] the inverse-transform sampler behind it
//! - [`CheckpointTimer`] fixed-rate timer re-armed after every checkpoint
//!
//! Both timers accept `None` as "feature disabled": they then never fire,
//! which lets the supervision loop select over them unconditionally.

mod periodic;
mod poisson;

pub use periodic::CheckpointTimer;
pub use poisson::{ExponentialDelay, PoissonTimer};
