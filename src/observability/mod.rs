//! Observation hooks for dinners.
//!
//! Every fork, gate, and philosopher transition is reported to the
//! [`Observer`] installed in a philosopher's [`Cx`](crate::Cx). The default
//! observer discards events; [`EventLog`] records them in a single global
//! order so tests can check mutual exclusion and gate occupancy after the
//! fact.

pub mod event;
pub mod log;

pub use event::{DiningEvent, EventKind};
pub use log::{EventLog, ExclusionViolation, RecordedEvent};

/// Receives dining events.
///
/// Called synchronously on the philosopher's thread, while that philosopher
/// still holds (or has not yet released) the resource the event concerns.
/// Implementations must be cheap and must not block on table primitives.
pub trait Observer: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &DiningEvent);
}

/// An observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&self, _event: &DiningEvent) {}
}
