//! End-of-dinner report.

use crate::error::Error;
use crate::sync::{ForkStats, GateStats};
use crate::types::{CancelReason, PhilosopherId, Strategy};
use core::fmt;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// How a philosopher's run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhilosopherOutcome {
    /// Ate every meal.
    Finished,
    /// Stopped early on a cancellation request.
    Cancelled {
        /// Why.
        reason: CancelReason,
    },
    /// Ran out of timed-retry attempts.
    GaveUp {
        /// Attempts made for the unfinished meal.
        attempts: u32,
    },
    /// The philosopher's thread panicked.
    Panicked,
    /// The philosopher never dined because the table itself failed.
    Failed {
        /// The table error.
        error: String,
    },
}

impl PhilosopherOutcome {
    /// Classifies the result of [`Philosopher::dine`](crate::Philosopher::dine).
    #[must_use]
    pub fn from_result(result: &Result<(), Error>) -> Self {
        match result {
            Ok(()) => Self::Finished,
            Err(Error::Cancelled(reason)) => Self::Cancelled {
                reason: reason.clone(),
            },
            Err(Error::RetriesExhausted { attempts, .. }) => Self::GaveUp {
                attempts: *attempts,
            },
            Err(Error::Panicked(_)) => Self::Panicked,
            Err(err @ (Error::Config(_) | Error::Spawn { .. } | Error::AlreadyServed)) => {
                Self::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    /// Returns true for [`PhilosopherOutcome::Finished`].
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for PhilosopherOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "finished"),
            Self::Cancelled { reason } => write!(f, "cancelled ({reason})"),
            Self::GaveUp { attempts } => write!(f, "gave up after {attempts} attempts"),
            Self::Panicked => write!(f, "panicked"),
            Self::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// One philosopher's line in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhilosopherReport {
    /// The philosopher.
    pub id: PhilosopherId,
    /// Meals eaten.
    pub meals: u32,
    /// Timed-retry backoffs taken.
    pub retries: u64,
    /// How the run ended.
    pub outcome: PhilosopherOutcome,
}

/// Everything a finished dinner reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DinnerReport {
    /// The strategy used.
    pub strategy: Strategy,
    /// Meals each philosopher was meant to eat.
    pub meals_per_philosopher: u32,
    /// Wall-clock duration of the dinner.
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Per-philosopher results, by seat.
    pub philosophers: Vec<PhilosopherReport>,
    /// Per-fork counters, by seat.
    pub forks: Vec<ForkStats>,
    /// Gate counters, if the table had a gate.
    pub gate: Option<GateStats>,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

impl DinnerReport {
    /// Sum of meals over all philosophers.
    #[must_use]
    pub fn total_meals(&self) -> u64 {
        self.philosophers.iter().map(|p| u64::from(p.meals)).sum()
    }

    /// Sum of successful fork acquisitions over all forks.
    #[must_use]
    pub fn total_acquisitions(&self) -> u64 {
        self.forks.iter().map(|f| f.acquisitions).sum()
    }

    /// Sum of expired timed attempts over all forks.
    #[must_use]
    pub fn total_timeouts(&self) -> u64 {
        self.forks.iter().map(|f| f.timeouts).sum()
    }

    /// Sum of timed-retry backoffs over all philosophers.
    #[must_use]
    pub fn total_retries(&self) -> u64 {
        self.philosophers.iter().map(|p| p.retries).sum()
    }

    /// Returns true if every philosopher finished.
    #[must_use]
    pub fn all_finished(&self) -> bool {
        self.philosophers.iter().all(|p| p.outcome.is_finished())
    }

    /// Returns true if every philosopher ate every planned meal.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.all_finished()
            && self
                .philosophers
                .iter()
                .all(|p| p.meals == self.meals_per_philosopher)
    }
}

impl fmt::Display for DinnerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dinner over ({}). Statistics:", self.strategy)?;
        for philosopher in &self.philosophers {
            write!(
                f,
                "  Philosopher {} ate {} times",
                philosopher.id.index(),
                philosopher.meals
            )?;
            if !philosopher.outcome.is_finished() {
                write!(f, " [{}]", philosopher.outcome)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        writeln!(f, "Total time: {} ms", self.elapsed.as_millis())?;
        writeln!(f, "Total meals: {}", self.total_meals())?;
        writeln!(f, "Total fork acquisitions: {}", self.total_acquisitions())?;
        if let Some(gate) = &self.gate {
            writeln!(
                f,
                "Gate peak occupancy: {}/{}",
                gate.peak_in_use, gate.capacity
            )?;
        }
        if self.strategy == Strategy::TimedRetry {
            writeln!(f, "Total timed-out attempts: {}", self.total_timeouts())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForkId;

    fn sample() -> DinnerReport {
        DinnerReport {
            strategy: Strategy::TimedRetry,
            meals_per_philosopher: 2,
            elapsed: Duration::from_millis(1234),
            philosophers: vec![
                PhilosopherReport {
                    id: PhilosopherId::new(0),
                    meals: 2,
                    retries: 1,
                    outcome: PhilosopherOutcome::Finished,
                },
                PhilosopherReport {
                    id: PhilosopherId::new(1),
                    meals: 1,
                    retries: 3,
                    outcome: PhilosopherOutcome::Cancelled {
                        reason: CancelReason::timeout(),
                    },
                },
            ],
            forks: vec![
                ForkStats {
                    id: ForkId::new(0),
                    acquisitions: 4,
                    timeouts: 1,
                },
                ForkStats {
                    id: ForkId::new(1),
                    acquisitions: 3,
                    timeouts: 2,
                },
            ],
            gate: None,
        }
    }

    #[test]
    fn totals_sum_rows() {
        let report = sample();
        assert_eq!(report.total_meals(), 3);
        assert_eq!(report.total_acquisitions(), 7);
        assert_eq!(report.total_timeouts(), 3);
        assert_eq!(report.total_retries(), 4);
        assert!(!report.all_finished());
        assert!(!report.is_complete());
    }

    #[test]
    fn outcome_from_result() {
        assert_eq!(
            PhilosopherOutcome::from_result(&Ok(())),
            PhilosopherOutcome::Finished
        );
        assert_eq!(
            PhilosopherOutcome::from_result(&Err(Error::RetriesExhausted {
                philosopher: PhilosopherId::new(0),
                attempts: 4,
            })),
            PhilosopherOutcome::GaveUp { attempts: 4 }
        );
        assert_eq!(
            PhilosopherOutcome::from_result(&Err(Error::Panicked(PhilosopherId::new(0)))),
            PhilosopherOutcome::Panicked
        );
        assert_eq!(
            PhilosopherOutcome::from_result(&Err(Error::AlreadyServed)),
            PhilosopherOutcome::Failed {
                error: "table has already served its dinner".into()
            }
        );
        let spawn = Error::Spawn {
            philosopher: PhilosopherId::new(2),
            source: std::io::Error::other("no threads left"),
        };
        let outcome = PhilosopherOutcome::from_result(&Err(spawn));
        assert!(matches!(&outcome, PhilosopherOutcome::Failed { error } if error.contains("P2")));
        assert!(!outcome.is_finished());
    }

    #[test]
    fn summary_mentions_timeouts_for_timed_retry() {
        let text = sample().to_string();
        assert!(text.contains("Philosopher 0 ate 2 times\n"));
        assert!(text.contains("Philosopher 1 ate 1 times [cancelled (timeout)]"));
        assert!(text.contains("Total time: 1234 ms"));
        assert!(text.contains("Total meals: 3"));
        assert!(text.contains("Total timed-out attempts: 3"));
    }

    #[test]
    fn serializes_elapsed_as_millis() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(json["elapsed_ms"], 1234);
        assert_eq!(json["strategy"], "timed_retry");
        assert_eq!(json["philosophers"][1]["outcome"]["status"], "cancelled");
        assert_eq!(json["forks"][0]["acquisitions"], 4);
    }
}
