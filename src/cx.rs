//! Philosopher capability context.
//!
//! A [`Cx`] is everything a philosopher needs from its surroundings: its
//! identity, the table's cancellation signal, its own delay generator, and the
//! observer that receives its events. Every blocking operation on a fork or
//! gate takes a `&Cx`, so cancellation and instrumentation reach every
//! suspension point without ambient state.

use crate::cancel::CancelSignal;
use crate::config::DelayRange;
use crate::error::Result;
use crate::observability::{DiningEvent, EventKind, NullObserver, Observer};
use crate::tracing_compat::trace;
use crate::types::PhilosopherId;
use crate::util::DetRng;
use core::fmt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Capability context for one philosopher.
pub struct Cx {
    philosopher: PhilosopherId,
    cancel: Arc<CancelSignal>,
    rng: Mutex<DetRng>,
    observer: Arc<dyn Observer>,
}

impl Cx {
    /// Creates a context.
    #[must_use]
    pub fn new(
        philosopher: PhilosopherId,
        cancel: Arc<CancelSignal>,
        seed: u64,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            philosopher,
            cancel,
            rng: Mutex::new(DetRng::new(seed)),
            observer,
        }
    }

    /// Creates a context for tests: philosopher 0, its own cancellation
    /// signal, a fixed seed, and no observer.
    #[must_use]
    pub fn for_testing() -> Self {
        Self::for_philosopher(PhilosopherId::new(0))
    }

    /// Like [`Cx::for_testing`], for the given philosopher.
    #[must_use]
    pub fn for_philosopher(philosopher: PhilosopherId) -> Self {
        Self::new(
            philosopher,
            Arc::new(CancelSignal::new()),
            u64::from(philosopher.index()),
            Arc::new(NullObserver),
        )
    }

    /// Returns the philosopher this context belongs to.
    #[inline]
    #[must_use]
    pub fn philosopher(&self) -> PhilosopherId {
        self.philosopher
    }

    /// Returns the cancellation signal.
    #[must_use]
    pub fn cancel_signal(&self) -> &Arc<CancelSignal> {
        &self.cancel
    }

    /// Returns true once cancellation has been requested.
    #[inline]
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_requested()
    }

    /// Returns `Err(Error::Cancelled)` if cancellation has been requested.
    #[inline]
    pub fn checkpoint(&self) -> Result<()> {
        self.cancel.checkpoint()
    }

    /// Sleeps, waking early on cancellation.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        self.cancel.sleep(duration)
    }

    /// Draws a delay uniformly from `range`.
    pub fn draw(&self, range: DelayRange) -> Duration {
        self.rng.lock().millis_in(range.min_ms, range.max_ms)
    }

    /// Reports an event to the observer.
    pub fn emit(&self, kind: EventKind) {
        trace!(philosopher = %self.philosopher, event = %kind, "dining event");
        self.observer
            .on_event(&DiningEvent::now(self.philosopher, kind));
    }
}

impl fmt::Debug for Cx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cx")
            .field("philosopher", &self.philosopher)
            .field("cancel_requested", &self.is_cancel_requested())
            .finish_non_exhaustive()
    }
}
