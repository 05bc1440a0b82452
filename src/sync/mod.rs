//! Synchronization primitives for the table.
//!
//! - [`Fork`]: an exclusive, holder-agnostic lock with blocking and timed
//!   acquisition, returning a [`ForkGuard`] that releases on drop
//! - [`Gate`]: a counting admission pool (the butler), returning a
//!   [`GatePermit`] that returns its permit on drop
//!
//! # Cancel Safety
//!
//! Both primitives take a [`Cx`](crate::Cx) on every blocking call. A wait
//! interrupted by cancellation returns `Err(Error::Cancelled)` without marking
//! anything held. Anything already held is owned by a guard, so it is
//! released on every exit path, including `?` and unwinding.

pub mod fork;
pub mod gate;

pub use fork::{Fork, ForkGuard, ForkStats};
pub use gate::{Gate, GatePermit, GateStats};

use std::time::Duration;

/// Upper bound on how long a blocked fork or gate wait goes without checking
/// for cancellation.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(5);
