//! Cancellation signals for a table and its seats.
//!
//! A table owns one signal and gives each seat a child of it. Cancelling the
//! table cascades to every seat; cancelling a seat touches only that seat.
//! A request is sticky: once set it stays set, and later requests can only
//! strengthen the recorded reason. Sleeps wake immediately on a request;
//! blocking fork and gate waits observe it within
//! [`CANCEL_POLL_INTERVAL`](crate::sync::CANCEL_POLL_INTERVAL).

use crate::error::{Error, Result};
use crate::types::CancelReason;
use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A sticky, strengthen-only cancellation flag with an interruptible sleep.
#[derive(Debug, Default)]
pub struct CancelSignal {
    requested: AtomicBool,
    reason: Mutex<Option<CancelReason>>,
    wake: Condvar,
    children: Mutex<Vec<Weak<CancelSignal>>>,
}

impl CancelSignal {
    /// Creates a signal with no pending request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signal that is cancelled whenever `self` is.
    ///
    /// Cancelling the child does not affect `self`. A child of an already
    /// cancelled signal starts out cancelled with the parent's reason.
    #[must_use]
    pub fn child(&self) -> Arc<Self> {
        let child = Arc::new(Self::new());
        self.children.lock().push(Arc::downgrade(&child));
        if let Some(reason) = self.reason() {
            child.cancel(reason);
        }
        child
    }

    /// Requests cancellation of this signal and all of its children.
    ///
    /// Returns `true` if this was the first request. A later request only
    /// replaces the reason if it is more severe.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        let mut current = self.reason.lock();
        let first = match current.as_mut() {
            Some(existing) => {
                existing.strengthen(&reason);
                false
            }
            None => {
                *current = Some(reason.clone());
                true
            }
        };
        self.requested.store(true, Ordering::Release);
        drop(current);
        self.wake.notify_all();

        let children: Vec<Arc<Self>> = {
            let mut children = self.children.lock();
            children.retain(|child| child.strong_count() > 0);
            children.iter().filter_map(Weak::upgrade).collect()
        };
        for child in children {
            child.cancel(reason.clone());
        }
        first
    }

    /// Returns true once cancellation has been requested.
    #[inline]
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Returns the current cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.lock().clone()
    }

    /// Returns `Err(Error::Cancelled)` if cancellation has been requested.
    #[inline]
    pub fn checkpoint(&self) -> Result<()> {
        if !self.is_requested() {
            return Ok(());
        }
        Err(Error::Cancelled(self.reason().unwrap_or_default()))
    }

    /// Sleeps for `duration`, returning early with `Err(Error::Cancelled)` if
    /// cancellation is requested before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(duration);
        let mut reason = self.reason.lock();
        loop {
            if let Some(reason) = reason.as_ref() {
                return Err(Error::Cancelled(reason.clone()));
            }
            match deadline {
                Some(deadline) => {
                    if self.wake.wait_until(&mut reason, deadline).timed_out() {
                        return reason
                            .as_ref()
                            .map_or(Ok(()), |reason| Err(Error::Cancelled(reason.clone())));
                    }
                }
                None => self.wake.wait(&mut reason),
            }
        }
    }
}

/// A cloneable handle for cancelling a dinner from outside it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    signal: Arc<CancelSignal>,
}

impl CancelHandle {
    pub(crate) fn new(signal: Arc<CancelSignal>) -> Self {
        Self { signal }
    }

    /// Requests cancellation of everyone the handle covers: the whole table,
    /// or a single seat.
    ///
    /// Returns `true` if this was the first request.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.signal.cancel(reason)
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_requested()
    }
}
