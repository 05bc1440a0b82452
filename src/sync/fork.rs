//! Fork: an exclusive lock with timed acquisition.
//!
//! A fork only knows whether it is held, not by whom. Ownership is carried by
//! the [`ForkGuard`] returned from a successful acquisition; dropping the guard
//! is the only way to release the fork.

use super::CANCEL_POLL_INTERVAL;
use crate::cx::Cx;
use crate::error::Result;
use crate::observability::EventKind;
use crate::tracing_compat::trace;
use crate::types::ForkId;
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters of a fork at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForkStats {
    /// The fork.
    pub id: ForkId,
    /// Successful acquisitions, blocking or timed.
    pub acquisitions: u64,
    /// Timed attempts that expired.
    pub timeouts: u64,
}

/// A fork shared by two neighbouring philosophers.
#[derive(Debug)]
pub struct Fork {
    id: ForkId,
    held: Mutex<bool>,
    released: Condvar,
    acquisitions: AtomicU64,
    timeouts: AtomicU64,
}

impl Fork {
    /// Creates a free fork.
    #[must_use]
    pub fn new(id: ForkId) -> Self {
        Self {
            id,
            held: Mutex::new(false),
            released: Condvar::new(),
            acquisitions: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    /// Returns the fork's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ForkId {
        self.id
    }

    /// Returns true if some philosopher currently holds the fork.
    #[must_use]
    pub fn is_held(&self) -> bool {
        *self.held.lock()
    }

    /// Returns the number of successful acquisitions so far.
    #[must_use]
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Acquire)
    }

    /// Returns the number of expired timed attempts so far.
    #[must_use]
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Acquire)
    }

    /// Returns both counters.
    #[must_use]
    pub fn stats(&self) -> ForkStats {
        ForkStats {
            id: self.id,
            acquisitions: self.acquisitions(),
            timeouts: self.timeouts(),
        }
    }

    /// Blocks until the fork is free, then takes it.
    ///
    /// Fails only if cancellation is requested before the fork is obtained, in
    /// which case the fork is left as it was.
    pub fn acquire<'a>(&'a self, cx: &'a Cx) -> Result<ForkGuard<'a>> {
        cx.checkpoint()?;
        let mut held = self.held.lock();
        while *held {
            self.released.wait_for(&mut held, CANCEL_POLL_INTERVAL);
            if let Err(err) = cx.checkpoint() {
                self.pass_on_wakeup(&held);
                return Err(err);
            }
        }
        Ok(self.claim(held, cx))
    }

    /// Tries to take the fork, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` and counts a timeout if the fork stayed held. A
    /// cancellation during the wait is an error, not a timeout.
    pub fn try_acquire_for<'a>(
        &'a self,
        cx: &'a Cx,
        timeout: Duration,
    ) -> Result<Option<ForkGuard<'a>>> {
        cx.checkpoint()?;
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.acquire(cx).map(Some);
        };
        let mut held = self.held.lock();
        while *held {
            let now = Instant::now();
            if now >= deadline {
                self.timeouts.fetch_add(1, Ordering::AcqRel);
                drop(held);
                trace!(fork = %self.id, philosopher = %cx.philosopher(), "fork attempt timed out");
                cx.emit(EventKind::ForkTimedOut(self.id));
                return Ok(None);
            }
            let slice = deadline.min(now + CANCEL_POLL_INTERVAL);
            self.released.wait_until(&mut held, slice);
            if let Err(err) = cx.checkpoint() {
                self.pass_on_wakeup(&held);
                return Err(err);
            }
        }
        Ok(Some(self.claim(held, cx)))
    }

    fn claim<'a>(&'a self, mut held: MutexGuard<'_, bool>, cx: &'a Cx) -> ForkGuard<'a> {
        *held = true;
        self.acquisitions.fetch_add(1, Ordering::AcqRel);
        drop(held);
        trace!(fork = %self.id, philosopher = %cx.philosopher(), "fork acquired");
        cx.emit(EventKind::ForkAcquired(self.id));
        ForkGuard { fork: self, cx }
    }

    // A waiter leaving on cancellation may have consumed the notification
    // meant for another waiter.
    fn pass_on_wakeup(&self, held: &MutexGuard<'_, bool>) {
        if !**held {
            self.released.notify_one();
        }
    }

    fn release(&self) {
        let mut held = self.held.lock();
        assert!(*held, "{} released while not held", self.id);
        *held = false;
        drop(held);
        self.released.notify_one();
    }
}

/// Proof of holding a fork. Dropping it puts the fork down.
#[must_use = "fork will be immediately released if not held"]
pub struct ForkGuard<'a> {
    fork: &'a Fork,
    cx: &'a Cx,
}

impl ForkGuard<'_> {
    /// Returns the id of the held fork.
    #[must_use]
    pub fn fork_id(&self) -> ForkId {
        self.fork.id
    }

    /// Puts the fork down.
    pub fn release(self) {
        drop(self);
    }
}

impl core::fmt::Debug for ForkGuard<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ForkGuard")
            .field("fork", &self.fork.id)
            .field("holder", &self.cx.philosopher())
            .finish()
    }
}

impl Drop for ForkGuard<'_> {
    fn drop(&mut self) {
        self.cx.emit(EventKind::ForkReleased(self.fork.id));
        trace!(fork = %self.fork.id, philosopher = %self.cx.philosopher(), "fork released");
        self.fork.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CancelReason, PhilosopherId};
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    #[test]
    fn acquire_and_release_update_state() {
        let cx = Cx::for_testing();
        let fork = Fork::new(ForkId::new(0));
        assert!(!fork.is_held());

        let guard = fork.acquire(&cx).expect("acquire");
        assert!(fork.is_held());
        assert_eq!(guard.fork_id(), ForkId::new(0));
        assert_eq!(fork.acquisitions(), 1);

        guard.release();
        assert!(!fork.is_held());
        assert_eq!(fork.stats().acquisitions, 1);
        assert_eq!(fork.stats().timeouts, 0);
    }

    #[test]
    fn timed_attempt_on_held_fork_times_out() {
        let cx = Cx::for_testing();
        let other = Cx::for_philosopher(PhilosopherId::new(1));
        let fork = Fork::new(ForkId::new(3));

        let _held = fork.acquire(&cx).expect("acquire");
        let start = Instant::now();
        let attempt = fork
            .try_acquire_for(&other, Duration::from_millis(30))
            .expect("not cancelled");
        assert!(attempt.is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(fork.timeouts(), 1);
        assert_eq!(fork.acquisitions(), 1);
    }

    #[test]
    fn timed_attempt_on_free_fork_succeeds() {
        let cx = Cx::for_testing();
        let fork = Fork::new(ForkId::new(1));
        let guard = fork
            .try_acquire_for(&cx, Duration::ZERO)
            .expect("not cancelled");
        assert!(guard.is_some());
        assert_eq!(fork.timeouts(), 0);
    }

    #[test]
    fn blocked_acquire_proceeds_after_release() {
        let fork = Arc::new(Fork::new(ForkId::new(0)));
        let owner = Cx::for_testing();
        let guard = fork.acquire(&owner).expect("acquire");

        let waiter = {
            let fork = Arc::clone(&fork);
            thread::spawn(move || {
                let cx = Cx::for_philosopher(PhilosopherId::new(1));
                let guard = fork.acquire(&cx).expect("acquire after release");
                drop(guard);
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.join().expect("waiter panicked");
        assert_eq!(fork.acquisitions(), 2);
        assert!(!fork.is_held());
    }

    #[test]
    fn cancelled_wait_leaves_fork_untouched() {
        let fork = Arc::new(Fork::new(ForkId::new(0)));
        let owner = Cx::for_testing();
        let guard = fork.acquire(&owner).expect("acquire");

        let waiter_cx = Arc::new(Cx::for_philosopher(PhilosopherId::new(1)));
        let waiter = {
            let fork = Arc::clone(&fork);
            let cx = Arc::clone(&waiter_cx);
            thread::spawn(move || fork.acquire(&cx).map(|_| ()))
        };

        thread::sleep(Duration::from_millis(20));
        waiter_cx.cancel_signal().cancel(CancelReason::user("stop"));
        let result = waiter.join().expect("waiter panicked");
        assert!(result.unwrap_err().is_cancelled());

        assert!(fork.is_held());
        assert_eq!(fork.acquisitions(), 1);
        drop(guard);
        assert!(!fork.is_held());
    }

    #[test]
    fn cancelled_timed_attempt_is_not_a_timeout() {
        let fork = Fork::new(ForkId::new(0));
        let cx = Cx::for_testing();
        cx.cancel_signal().cancel(CancelReason::shutdown());
        let err = fork
            .try_acquire_for(&cx, Duration::from_millis(10))
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(fork.timeouts(), 0);
        assert!(!fork.is_held());
    }

    #[test]
    fn contended_fork_is_never_double_held() {
        let fork = Arc::new(Fork::new(ForkId::new(0)));
        let inside = Arc::new(AtomicBool::new(false));
        let workers: Vec<_> = (0..4)
            .map(|i| {
                let fork = Arc::clone(&fork);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    let cx = Cx::for_philosopher(PhilosopherId::new(i));
                    for _ in 0..50 {
                        let guard = fork.acquire(&cx).expect("acquire");
                        assert!(!inside.swap(true, Ordering::SeqCst), "two holders");
                        thread::yield_now();
                        inside.store(false, Ordering::SeqCst);
                        drop(guard);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker panicked");
        }
        assert_eq!(fork.acquisitions(), 200);
    }
}
