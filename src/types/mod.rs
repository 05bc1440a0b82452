//! Core types: identifiers, cancellation reasons, and strategy selection.

pub mod cancel;
pub mod id;
pub mod strategy;

pub use cancel::{CancelKind, CancelReason};
pub use id::{ForkId, PhilosopherId};
pub use strategy::Strategy;
