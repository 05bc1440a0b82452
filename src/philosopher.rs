//! Philosophers and their fork acquisition strategies.
//!
//! A philosopher repeats think → acquire both forks → eat → release both for
//! a fixed number of meals. Only the acquire/release step differs between
//! strategies:
//!
//! | Strategy | Acquire | Why it cannot deadlock |
//! |---|---|---|
//! | Gated | gate, left, right | at most `seats - 1` philosophers compete |
//! | Ordered | lower id, higher id | no one holds a higher fork while waiting on a lower one |
//! | TimedRetry | timed left, timed right, back off | partial holds are dropped on timeout |
//!
//! Every fork and permit is held through a guard, so whichever way a step
//! exits (success, cancellation, panic) the philosopher puts down what it
//! holds, in reverse order of acquisition.

use crate::config::{DelayRange, RetryConfig, TableConfig};
use crate::cx::Cx;
use crate::error::{Error, Result};
use crate::observability::EventKind;
use crate::sync::{Fork, Gate};
use crate::tracing_compat::{debug, warn};
use crate::types::{PhilosopherId, Strategy};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Admission control available to a gated philosopher.
#[derive(Debug, Clone)]
pub enum Admission {
    /// Pass through the shared gate before reaching for forks.
    Gate(Arc<Gate>),
    /// No gate. A gated philosopher then takes left and right with no
    /// protection at all; a full table of them can deadlock.
    Unguarded,
}

impl Admission {
    /// Returns the gate, if any.
    #[must_use]
    pub fn gate(&self) -> Option<&Gate> {
        match self {
            Self::Gate(gate) => Some(gate),
            Self::Unguarded => None,
        }
    }

    /// Returns true if a gate is present.
    #[must_use]
    pub fn is_guarded(&self) -> bool {
        matches!(self, Self::Gate(_))
    }
}

/// Per-philosopher timing and meal plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Meals to eat before leaving.
    pub meals: u32,
    /// Thinking delay range.
    pub think: DelayRange,
    /// Eating delay range.
    pub eat: DelayRange,
    /// Timed-retry policy.
    pub retry: RetryConfig,
}

impl From<&TableConfig> for Schedule {
    fn from(config: &TableConfig) -> Self {
        Self {
            meals: config.meals,
            think: config.think,
            eat: config.eat,
            retry: config.retry,
        }
    }
}

/// A philosopher seated between two forks.
#[derive(Debug)]
pub struct Philosopher {
    id: PhilosopherId,
    left: Arc<Fork>,
    right: Arc<Fork>,
    strategy: Strategy,
    admission: Admission,
    schedule: Schedule,
    meals: AtomicU32,
    retries: AtomicU64,
}

impl Philosopher {
    /// Seats a philosopher between `left` and `right`.
    ///
    /// A gated philosopher without a gate runs in the unprotected fallback
    /// and is reported with a warning.
    #[must_use]
    pub fn new(
        id: PhilosopherId,
        left: Arc<Fork>,
        right: Arc<Fork>,
        strategy: Strategy,
        admission: Admission,
        schedule: Schedule,
    ) -> Self {
        if strategy.uses_gate() && !admission.is_guarded() {
            warn!(
                philosopher = %id,
                "gated strategy without a gate: forks taken left then right with no deadlock protection"
            );
        }
        Self {
            id,
            left,
            right,
            strategy,
            admission,
            schedule,
            meals: AtomicU32::new(0),
            retries: AtomicU64::new(0),
        }
    }

    /// Returns the philosopher's id.
    #[must_use]
    pub fn id(&self) -> PhilosopherId {
        self.id
    }

    /// Returns the left fork.
    #[must_use]
    pub fn left(&self) -> &Fork {
        &self.left
    }

    /// Returns the right fork.
    #[must_use]
    pub fn right(&self) -> &Fork {
        &self.right
    }

    /// Returns the acquisition strategy.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Returns the admission capability.
    #[must_use]
    pub fn admission(&self) -> &Admission {
        &self.admission
    }

    /// Returns the number of meals eaten so far.
    #[must_use]
    pub fn meals_eaten(&self) -> u32 {
        self.meals.load(Ordering::Acquire)
    }

    /// Returns the number of timed-retry backoffs so far.
    #[must_use]
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Acquire)
    }

    /// Runs the whole dinner for this philosopher on the calling thread.
    ///
    /// Returns after the last meal, or early with the first error. Nothing is
    /// held when this returns.
    pub fn dine(&self, cx: &Cx) -> Result<()> {
        for meal in 1..=self.schedule.meals {
            cx.emit(EventKind::Thinking { meal });
            let pause = cx.draw(self.schedule.think);
            debug!(philosopher = %self.id, meal, ?pause, "thinking");
            cx.sleep(pause)?;

            cx.emit(EventKind::Hungry);
            match self.strategy {
                Strategy::Gated => match &self.admission {
                    Admission::Gate(gate) => self.dine_gated(cx, gate)?,
                    Admission::Unguarded => self.dine_unguarded(cx)?,
                },
                Strategy::Ordered => self.dine_ordered(cx)?,
                Strategy::TimedRetry => self.dine_timed_retry(cx)?,
            }
        }
        let meals = self.meals_eaten();
        debug!(philosopher = %self.id, meals, "finished");
        cx.emit(EventKind::Finished { meals });
        Ok(())
    }

    fn dine_gated(&self, cx: &Cx, gate: &Gate) -> Result<()> {
        let permit = gate.acquire(cx)?;
        let left = self.left.acquire(cx)?;
        let right = self.right.acquire(cx)?;
        self.eat(cx)?;
        right.release();
        left.release();
        permit.release();
        Ok(())
    }

    // Unprotected fallback for a gated philosopher with no gate. Kept so a
    // misconfigured table fails visibly rather than silently switching
    // strategy; a full ring of these can deadlock.
    fn dine_unguarded(&self, cx: &Cx) -> Result<()> {
        let left = self.left.acquire(cx)?;
        let right = self.right.acquire(cx)?;
        self.eat(cx)?;
        right.release();
        left.release();
        Ok(())
    }

    fn dine_ordered(&self, cx: &Cx) -> Result<()> {
        let (first, second) = if self.left.id() < self.right.id() {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };
        let first = first.acquire(cx)?;
        let second = second.acquire(cx)?;
        self.eat(cx)?;
        second.release();
        first.release();
        Ok(())
    }

    fn dine_timed_retry(&self, cx: &Cx) -> Result<()> {
        let policy = self.schedule.retry;
        let timeout = policy.attempt_timeout();
        let mut attempts: u32 = 0;
        loop {
            cx.checkpoint()?;
            attempts = attempts.saturating_add(1);

            if let Some(left) = self.left.try_acquire_for(cx, timeout)? {
                if let Some(right) = self.right.try_acquire_for(cx, timeout)? {
                    self.eat(cx)?;
                    right.release();
                    left.release();
                    return Ok(());
                }
                left.release();
            }

            if policy.max_attempts.is_some_and(|max| attempts >= max) {
                warn!(philosopher = %self.id, attempts, "giving up on meal");
                return Err(Error::RetriesExhausted {
                    philosopher: self.id,
                    attempts,
                });
            }

            self.retries.fetch_add(1, Ordering::AcqRel);
            let delay = cx.draw(policy.backoff);
            debug!(philosopher = %self.id, attempts, ?delay, "backing off");
            cx.emit(EventKind::BackingOff {
                attempt: attempts,
                delay,
            });
            cx.sleep(delay)?;
        }
    }

    fn eat(&self, cx: &Cx) -> Result<()> {
        let meal = self.meals.fetch_add(1, Ordering::AcqRel) + 1;
        cx.emit(EventKind::Eating { meal });
        let pause = cx.draw(self.schedule.eat);
        debug!(philosopher = %self.id, meal, ?pause, "eating");
        cx.sleep(pause)
    }
}
