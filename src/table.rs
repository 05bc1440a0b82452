//! The table: builds the ring, runs the dinner, collects the report.
//!
//! # Example
//!
//! ```no_run
//! use dining::{Strategy, Table, TableConfig};
//!
//! let table = Table::new(TableConfig::new(Strategy::Ordered))?;
//! let report = table.run()?;
//! assert_eq!(report.total_meals(), 25);
//! # Ok::<(), dining::Error>(())
//! ```

use crate::cancel::{CancelHandle, CancelSignal};
use crate::config::TableConfig;
use crate::cx::Cx;
use crate::error::{Error, Result};
use crate::observability::{EventKind, NullObserver, Observer};
use crate::philosopher::{Admission, Philosopher, Schedule};
use crate::report::{DinnerReport, PhilosopherOutcome, PhilosopherReport};
use crate::sync::{Fork, Gate};
use crate::tracing_compat::{info, warn};
use crate::types::{CancelReason, ForkId, PhilosopherId};
use crate::util::{derive_seed, os_seed};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

/// Builder for a [`Table`].
#[derive(Debug, Clone)]
pub struct TableBuilder {
    config: TableConfig,
    unguarded: bool,
}

impl TableBuilder {
    /// Starts from the given config.
    #[must_use]
    pub fn new(config: TableConfig) -> Self {
        Self {
            config,
            unguarded: false,
        }
    }

    /// Builds the table without a gate even if the strategy is gated.
    ///
    /// Gated philosophers then take their forks left then right with no
    /// deadlock protection. Only useful to demonstrate the failure mode; give
    /// such a table a deadline.
    #[must_use]
    pub fn unguarded(mut self) -> Self {
        self.unguarded = true;
        self
    }

    /// Validates the config and seats everyone.
    pub fn build(self) -> Result<Table> {
        let config = self.config;
        config.validate()?;
        let seats = u32::try_from(config.seats)
            .map_err(|_| crate::config::ConfigError::TooManySeats(config.seats))?;

        let forks: Vec<Arc<Fork>> = (0..seats)
            .map(|index| Arc::new(Fork::new(ForkId::new(index))))
            .collect();

        let gate = (config.strategy.uses_gate() && !self.unguarded)
            .then(|| Arc::new(Gate::for_seats(config.seats)));
        if config.strategy.uses_gate() && gate.is_none() {
            warn!(
                seats,
                "gated table built without a gate; deadlock avoidance is disabled"
            );
        }

        let schedule = Schedule::from(&config);
        let philosophers: Vec<Philosopher> = (0..seats)
            .map(|index| {
                let id = PhilosopherId::new(index);
                let (left, right) = id.forks(seats);
                let admission = match (&gate, config.strategy.uses_gate()) {
                    (Some(gate), true) => Admission::Gate(Arc::clone(gate)),
                    _ => Admission::Unguarded,
                };
                Philosopher::new(
                    id,
                    Arc::clone(&forks[left.as_usize()]),
                    Arc::clone(&forks[right.as_usize()]),
                    config.strategy,
                    admission,
                    schedule,
                )
            })
            .collect();

        let cancel = Arc::new(CancelSignal::new());
        let seat_signals = philosophers.iter().map(|_| cancel.child()).collect();

        Ok(Table {
            config,
            forks,
            gate,
            philosophers,
            cancel,
            seats: seat_signals,
            served: AtomicBool::new(false),
        })
    }
}

/// A set table: forks, an optional gate, and seated philosophers.
///
/// Counters are cumulative and cancellation is sticky, so a table hosts a
/// single dinner: a second [`Table::run`] fails with
/// [`Error::AlreadyServed`].
#[derive(Debug)]
pub struct Table {
    config: TableConfig,
    forks: Vec<Arc<Fork>>,
    gate: Option<Arc<Gate>>,
    philosophers: Vec<Philosopher>,
    cancel: Arc<CancelSignal>,
    // One child of `cancel` per seat.
    seats: Vec<Arc<CancelSignal>>,
    served: AtomicBool,
}

impl Table {
    /// Builds a table from `config`.
    pub fn new(config: TableConfig) -> Result<Self> {
        TableBuilder::new(config).build()
    }

    /// Returns a builder for `config`.
    #[must_use]
    pub fn builder(config: TableConfig) -> TableBuilder {
        TableBuilder::new(config)
    }

    /// Returns the config the table was built from.
    #[must_use]
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Returns the forks, by seat.
    #[must_use]
    pub fn forks(&self) -> &[Arc<Fork>] {
        &self.forks
    }

    /// Returns the gate, if the table has one.
    #[must_use]
    pub fn gate(&self) -> Option<&Arc<Gate>> {
        self.gate.as_ref()
    }

    /// Returns the philosophers, by seat.
    #[must_use]
    pub fn philosophers(&self) -> &[Philosopher] {
        &self.philosophers
    }

    /// Returns a handle that cancels the dinner from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(Arc::clone(&self.cancel))
    }

    /// Returns a handle that cancels one philosopher, leaving the rest of the
    /// table dining. `None` if no one sits at `philosopher`.
    #[must_use]
    pub fn cancel_handle_for(&self, philosopher: PhilosopherId) -> Option<CancelHandle> {
        self.seats
            .get(philosopher.index() as usize)
            .map(|seat| CancelHandle::new(Arc::clone(seat)))
    }

    /// Returns true once the dinner has been started.
    #[must_use]
    pub fn is_served(&self) -> bool {
        self.served.load(Ordering::Acquire)
    }

    /// Runs the dinner with no observer.
    pub fn run(&self) -> Result<DinnerReport> {
        self.run_observed(Arc::new(NullObserver))
    }

    /// Runs the dinner, reporting every event to `observer`.
    ///
    /// Spawns one thread per philosopher and blocks until all of them have
    /// left. If the config has a deadline and it elapses first, everyone still
    /// seated is cancelled with [`CancelReason::timeout`].
    pub fn run_observed(&self, observer: Arc<dyn Observer>) -> Result<DinnerReport> {
        if self.served.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyServed);
        }
        let seed = self.config.seed.unwrap_or_else(os_seed);
        info!(
            strategy = %self.config.strategy,
            seats = self.config.seats,
            meals = self.config.meals,
            seed,
            "dinner started"
        );
        if self.config.strategy.uses_gate() && self.gate.is_none() {
            warn!("running a gated dinner without a gate; it may deadlock");
        }
        let start = Instant::now();
        let seated = Countdown::new(self.philosophers.len());

        let outcomes = thread::scope(|scope| -> Result<Vec<PhilosopherOutcome>> {
            let mut handles = Vec::with_capacity(self.philosophers.len());
            for (philosopher, seat) in self.philosophers.iter().zip(&self.seats) {
                let id = philosopher.id();
                let cx = Cx::new(
                    id,
                    Arc::clone(seat),
                    derive_seed(seed, u64::from(id.index())),
                    Arc::clone(&observer),
                );
                let seated = &seated;
                let spawned = thread::Builder::new()
                    .name(format!("philosopher-{}", id.index()))
                    .spawn_scoped(scope, move || {
                        let _leaving = seated.leave_on_drop();
                        let result = philosopher.dine(&cx);
                        if let Err(Error::Cancelled(reason)) = &result {
                            warn!(philosopher = %id, %reason, "left the table early");
                            cx.emit(EventKind::Cancelled(reason.clone()));
                        }
                        result
                    });
                match spawned {
                    Ok(handle) => handles.push((id, handle)),
                    Err(source) => {
                        self.cancel.cancel(CancelReason::shutdown());
                        return Err(Error::Spawn {
                            philosopher: id,
                            source,
                        });
                    }
                }
            }

            if let Some(deadline) = self.config.deadline() {
                let expired = start
                    .checked_add(deadline)
                    .is_some_and(|at| !seated.wait_until(at));
                if expired {
                    warn!(?deadline, "deadline elapsed; cancelling the dinner");
                    self.cancel.cancel(CancelReason::timeout());
                }
            }

            Ok(handles
                .into_iter()
                .map(|(id, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        warn!(philosopher = %id, "philosopher thread panicked");
                        Err(Error::Panicked(id))
                    });
                    PhilosopherOutcome::from_result(&result)
                })
                .collect())
        })?;

        let report = DinnerReport {
            strategy: self.config.strategy,
            meals_per_philosopher: self.config.meals,
            elapsed: start.elapsed(),
            philosophers: self
                .philosophers
                .iter()
                .zip(outcomes)
                .map(|(philosopher, outcome)| PhilosopherReport {
                    id: philosopher.id(),
                    meals: philosopher.meals_eaten(),
                    retries: philosopher.retries(),
                    outcome,
                })
                .collect(),
            forks: self.forks.iter().map(|fork| fork.stats()).collect(),
            gate: self.gate.as_ref().map(|gate| gate.stats()),
        };
        info!(
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            meals = report.total_meals(),
            acquisitions = report.total_acquisitions(),
            timeouts = report.total_timeouts(),
            "dinner over"
        );
        Ok(report)
    }
}

/// Counts philosophers still seated and lets the coordinator wait for zero.
#[derive(Debug)]
struct Countdown {
    remaining: Mutex<usize>,
    empty: Condvar,
}

impl Countdown {
    fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            empty: Condvar::new(),
        }
    }

    fn leave_on_drop(&self) -> Leaving<'_> {
        Leaving(self)
    }

    fn leave(&self) {
        let mut remaining = self.remaining.lock();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.empty.notify_all();
        }
    }

    /// Returns true if everyone left before `deadline`.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self.empty.wait_until(&mut remaining, deadline).timed_out() {
                return *remaining == 0;
            }
        }
        true
    }
}

// Decrements on drop so a panicking philosopher still counts as gone.
struct Leaving<'a>(&'a Countdown);

impl Drop for Leaving<'_> {
    fn drop(&mut self) {
        self.0.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DelayRange, RetryConfig};
    use crate::types::Strategy;
    use std::time::Duration;

    fn quick(strategy: Strategy) -> TableConfig {
        TableConfig::new(strategy)
            .with_think(DelayRange::millis(0, 2))
            .with_eat(DelayRange::millis(0, 2))
            .with_retry(RetryConfig {
                attempt_timeout_ms: 5,
                backoff: DelayRange::millis(1, 3),
                max_attempts: None,
            })
            .with_seed(11)
    }

    #[test]
    fn ring_is_wired_by_seat() {
        let table = Table::new(quick(Strategy::Ordered)).expect("build");
        assert_eq!(table.forks().len(), 5);
        assert!(table.gate().is_none());
        for (index, philosopher) in table.philosophers().iter().enumerate() {
            assert_eq!(philosopher.id().index() as usize, index);
            assert_eq!(philosopher.left().id().as_usize(), index);
            assert_eq!(philosopher.right().id().as_usize(), (index + 1) % 5);
            assert!(!philosopher.admission().is_guarded());
        }
    }

    #[test]
    fn only_gated_tables_get_a_gate() {
        let table = Table::new(quick(Strategy::Gated)).expect("build");
        let gate = table.gate().expect("gated table has a gate");
        assert_eq!(gate.capacity(), 4);
        assert!(
            table
                .philosophers()
                .iter()
                .all(|p| p.admission().is_guarded())
        );
        assert!(
            Table::new(quick(Strategy::TimedRetry))
                .expect("build")
                .gate()
                .is_none()
        );
    }

    #[test]
    fn unguarded_builder_drops_the_gate() {
        let table = Table::builder(quick(Strategy::Gated))
            .unguarded()
            .build()
            .expect("build");
        assert!(table.gate().is_none());
        assert!(
            table
                .philosophers()
                .iter()
                .all(|p| !p.admission().is_guarded())
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Table::new(quick(Strategy::Ordered).with_seats(1)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn two_seat_table_finishes() {
        crate::test_utils::init_test_logging();
        for strategy in Strategy::ALL {
            let table = Table::new(quick(strategy).with_seats(2).with_meals(3)).expect("build");
            let report = table.run().expect("run");
            assert!(report.is_complete(), "{strategy}: {report}");
            assert_eq!(report.total_meals(), 6);
        }
    }

    #[test]
    fn a_table_serves_one_dinner() {
        let table = Table::new(quick(Strategy::Ordered).with_seats(2).with_meals(2)).expect("build");
        assert!(!table.is_served());
        let first = table.run().expect("first run");
        assert!(first.is_complete());
        assert!(table.is_served());

        let err = table.run().unwrap_err();
        assert!(matches!(err, Error::AlreadyServed));
        assert_eq!(table.forks().iter().map(|f| f.acquisitions()).sum::<u64>(), 8);
        assert!(table.philosophers().iter().all(|p| p.meals_eaten() == 2));
    }

    #[test]
    fn seat_handles_exist_only_for_seated_philosophers() {
        let table = Table::new(quick(Strategy::Gated)).expect("build");
        let seat = table.cancel_handle_for(PhilosopherId::new(4)).expect("seat 4");
        assert!(table.cancel_handle_for(PhilosopherId::new(5)).is_none());

        seat.cancel(CancelReason::user("leave"));
        assert!(seat.is_cancelled());
        assert!(!table.cancel_handle().is_cancelled());
        assert!(
            !table
                .cancel_handle_for(PhilosopherId::new(3))
                .expect("seat 3")
                .is_cancelled()
        );

        table.cancel_handle().cancel(CancelReason::shutdown());
        assert!(table.cancel_handle_for(PhilosopherId::new(3)).expect("seat 3").is_cancelled());
    }

    #[test]
    fn countdown_reports_deadline_miss() {
        let countdown = Countdown::new(1);
        assert!(!countdown.wait_until(Instant::now() + Duration::from_millis(10)));
        drop(countdown.leave_on_drop());
        assert!(countdown.wait_until(Instant::now() + Duration::from_millis(10)));
    }
}
