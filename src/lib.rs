//! Dining: cancel-correct dining philosophers.
//!
//! # Overview
//!
//! N philosophers sit around a table with one fork between each pair of
//! neighbours. Each needs both adjacent forks to eat, which is the textbook
//! circular-wait setup for deadlock. This crate provides the primitives and
//! three strategies that avoid it, each philosopher running on its own OS
//! thread:
//!
//! - **Gated**: a butler [`Gate`] admits at most `N - 1` philosophers to the
//!   acquisition phase
//! - **Ordered**: every philosopher takes the lower-numbered fork first
//! - **TimedRetry**: bounded-time attempts with a random backoff
//!
//! # Core Guarantees
//!
//! - **Mutual exclusion**: a [`Fork`] has at most one holder, always
//! - **Scoped release**: forks and permits are held through guards and are
//!   released on every exit path, including cancellation and panics
//! - **Cancel-correctness**: a cancelled wait never marks anything held
//! - **Bounded admission**: a [`Gate`] never hands out more permits than its
//!   capacity
//!
//! # Module Structure
//!
//! - [`types`]: Identifiers, cancellation reasons, strategy selection
//! - [`sync`]: [`Fork`] and [`Gate`] primitives
//! - [`cx`]: Per-philosopher capability context
//! - [`cancel`]: Shared cancellation signal
//! - [`philosopher`]: The think/eat loop and the three strategies
//! - [`table`]: The coordinator that seats, runs, and joins everyone
//! - [`report`]: End-of-dinner counters
//! - [`config`]: Table configuration
//! - [`observability`]: Event hooks and the recording [`EventLog`]
//! - [`error`](mod@error): Error types
//! - [`tracing_compat`]: Optional tracing integration (requires `tracing-integration` feature)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod cancel;
pub mod config;
pub mod cx;
pub mod error;
pub mod observability;
pub mod philosopher;
pub mod report;
pub mod sync;
pub mod table;
pub mod tracing_compat;
pub mod types;
pub mod util;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use cancel::{CancelHandle, CancelSignal};
pub use config::{ConfigError, DelayRange, RetryConfig, TableConfig};
pub use cx::Cx;
pub use error::{Error, Result};
pub use observability::{DiningEvent, EventKind, EventLog, NullObserver, Observer};
pub use philosopher::{Admission, Philosopher, Schedule};
pub use report::{DinnerReport, PhilosopherOutcome, PhilosopherReport};
pub use sync::{Fork, ForkGuard, ForkStats, Gate, GatePermit, GateStats};
pub use table::{Table, TableBuilder};
pub use types::{CancelKind, CancelReason, ForkId, PhilosopherId, Strategy};
