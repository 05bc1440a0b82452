//! Butler gate: a counting admission pool.
//!
//! A gate sized `seats - 1` lets every philosopher but one into the
//! acquisition phase at a time. With at least one philosopher always outside,
//! the ring of forks can never be fully held one-per-philosopher, so the
//! circular wait needed for deadlock cannot form.
//!
//! Waiters are not queued in order: whichever waiter observes a free permit
//! first takes it.
//!
//! # Example
//!
//! ```
//! use dining::{Cx, Gate};
//!
//! let gate = Gate::for_seats(5);
//! let cx = Cx::for_testing();
//!
//! let permit = gate.acquire(&cx)?;
//! assert_eq!(gate.available_permits(), 3);
//!
//! // Permit is returned when dropped
//! drop(permit);
//! assert_eq!(gate.available_permits(), 4);
//! # Ok::<(), dining::Error>(())
//! ```

use super::CANCEL_POLL_INTERVAL;
use crate::cx::Cx;
use crate::error::Result;
use crate::observability::EventKind;
use crate::tracing_compat::trace;
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Gate counters at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateStats {
    /// Maximum permits outstanding at once.
    pub capacity: usize,
    /// Highest number of permits outstanding at once so far.
    pub peak_in_use: usize,
}

/// A counting admission gate.
#[derive(Debug)]
pub struct Gate {
    /// Permits currently available.
    available: Mutex<usize>,
    freed: Condvar,
    capacity: usize,
    peak_in_use: AtomicUsize,
}

impl Gate {
    /// Creates a gate with `capacity` permits.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero: nobody could ever pass.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "gate capacity must be positive");
        Self {
            available: Mutex::new(capacity),
            freed: Condvar::new(),
            capacity,
            peak_in_use: AtomicUsize::new(0),
        }
    }

    /// Creates the gate for a table of `seats`, admitting `seats - 1`.
    ///
    /// # Panics
    ///
    /// Panics if `seats < 2`.
    #[must_use]
    pub fn for_seats(seats: usize) -> Self {
        assert!(seats >= 2, "a gated table needs at least 2 seats");
        Self::new(seats - 1)
    }

    /// Returns the maximum number of permits outstanding at once.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of permits currently available.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        *self.available.lock()
    }

    /// Returns the number of permits currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.capacity - self.available_permits()
    }

    /// Returns the highest number of permits held at once so far.
    #[must_use]
    pub fn peak_in_use(&self) -> usize {
        self.peak_in_use.load(Ordering::Acquire)
    }

    /// Returns capacity and peak usage.
    #[must_use]
    pub fn stats(&self) -> GateStats {
        GateStats {
            capacity: self.capacity,
            peak_in_use: self.peak_in_use(),
        }
    }

    /// Blocks until a permit is free, then takes it.
    ///
    /// A cancelled wait takes no permit.
    pub fn acquire<'a>(&'a self, cx: &'a Cx) -> Result<GatePermit<'a>> {
        cx.checkpoint()?;
        let mut available = self.available.lock();
        while *available == 0 {
            self.freed.wait_for(&mut available, CANCEL_POLL_INTERVAL);
            if let Err(err) = cx.checkpoint() {
                if *available > 0 {
                    self.freed.notify_one();
                }
                return Err(err);
            }
        }
        Ok(self.admit(available, cx))
    }

    /// Takes a permit if one is free right now.
    pub fn try_acquire<'a>(&'a self, cx: &'a Cx) -> Option<GatePermit<'a>> {
        let available = self.available.lock();
        if *available == 0 {
            return None;
        }
        Some(self.admit(available, cx))
    }

    fn admit<'a>(&'a self, mut available: MutexGuard<'_, usize>, cx: &'a Cx) -> GatePermit<'a> {
        *available -= 1;
        let in_use = self.capacity - *available;
        self.peak_in_use.fetch_max(in_use, Ordering::AcqRel);
        drop(available);
        trace!(philosopher = %cx.philosopher(), in_use, "gate entered");
        cx.emit(EventKind::GateEntered);
        GatePermit { gate: self, cx }
    }

    fn release(&self) {
        let mut available = self.available.lock();
        assert!(
            *available < self.capacity,
            "gate permit returned beyond capacity {}",
            self.capacity
        );
        *available += 1;
        drop(available);
        self.freed.notify_one();
    }
}

/// A held gate permit. Dropping it returns the permit.
#[must_use = "permit will be immediately released if not held"]
pub struct GatePermit<'a> {
    gate: &'a Gate,
    cx: &'a Cx,
}

impl GatePermit<'_> {
    /// Returns the permit to the gate.
    pub fn release(self) {
        drop(self);
    }
}

impl core::fmt::Debug for GatePermit<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GatePermit")
            .field("holder", &self.cx.philosopher())
            .finish()
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.cx.emit(EventKind::GateLeft);
        trace!(philosopher = %self.cx.philosopher(), "gate left");
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CancelReason, PhilosopherId};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn new_gate_has_all_permits() {
        let gate = Gate::for_seats(5);
        assert_eq!(gate.capacity(), 4);
        assert_eq!(gate.available_permits(), 4);
        assert_eq!(gate.in_use(), 0);
        assert_eq!(gate.peak_in_use(), 0);
    }

    #[test]
    #[should_panic(expected = "gate capacity must be positive")]
    fn zero_capacity_is_rejected() {
        let _ = Gate::new(0);
    }

    #[test]
    fn try_acquire_stops_at_capacity() {
        let cx = Cx::for_testing();
        let gate = Gate::new(2);
        let a = gate.try_acquire(&cx).expect("first permit");
        let b = gate.try_acquire(&cx).expect("second permit");
        assert!(gate.try_acquire(&cx).is_none());
        assert_eq!(gate.stats(), GateStats { capacity: 2, peak_in_use: 2 });
        drop(a);
        assert_eq!(gate.in_use(), 1);
        drop(b);
        assert_eq!(gate.available_permits(), 2);
    }

    #[test]
    fn blocked_acquire_proceeds_after_release() {
        let gate = Arc::new(Gate::new(1));
        let owner = Cx::for_testing();
        let permit = gate.acquire(&owner).expect("acquire");

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let cx = Cx::for_philosopher(PhilosopherId::new(1));
                gate.acquire(&cx).map(|_| ())
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        permit.release();
        waiter
            .join()
            .expect("waiter panicked")
            .expect("acquire after release");
        assert_eq!(gate.available_permits(), 1);
    }

    #[test]
    fn cancelled_wait_takes_no_permit() {
        let gate = Arc::new(Gate::new(1));
        let owner = Cx::for_testing();
        let permit = gate.acquire(&owner).expect("acquire");

        let waiter_cx = Arc::new(Cx::for_philosopher(PhilosopherId::new(1)));
        let waiter = {
            let gate = Arc::clone(&gate);
            let cx = Arc::clone(&waiter_cx);
            thread::spawn(move || gate.acquire(&cx).map(|_| ()))
        };

        thread::sleep(Duration::from_millis(20));
        waiter_cx.cancel_signal().cancel(CancelReason::user("stop"));
        assert!(waiter.join().expect("waiter panicked").unwrap_err().is_cancelled());
        assert_eq!(gate.in_use(), 1);
        drop(permit);
        assert_eq!(gate.in_use(), 0);
        assert_eq!(gate.peak_in_use(), 1);
    }

    proptest! {
        #[test]
        fn permit_count_stays_within_bounds(
            capacity in 1usize..6,
            ops in proptest::collection::vec(any::<bool>(), 0..64),
        ) {
            let cx = Cx::for_testing();
            let gate = Gate::new(capacity);
            let mut held = Vec::new();
            for take in ops {
                if take {
                    if let Some(permit) = gate.try_acquire(&cx) {
                        held.push(permit);
                    }
                } else {
                    held.pop();
                }
                prop_assert!(gate.available_permits() <= capacity);
                prop_assert_eq!(gate.in_use(), held.len());
                prop_assert!(gate.peak_in_use() <= capacity);
            }
        }
    }
}
