//! In-memory event recorder and the checks run over it.

use super::{DiningEvent, EventKind, Observer};
use crate::types::{ForkId, PhilosopherId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

/// An event with its position in the global order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Position in the log, starting at 0.
    pub seq: u64,
    /// The event.
    pub event: DiningEvent,
}

/// A mutual-exclusion violation found in a log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExclusionViolation {
    /// A philosopher picked up a fork someone else was holding.
    #[error("#{seq}: {intruder} picked up {fork} while {holder} held it")]
    DoubleHold {
        /// Position of the offending event.
        seq: u64,
        /// The contested fork.
        fork: ForkId,
        /// The philosopher already holding it.
        holder: PhilosopherId,
        /// The philosopher that also picked it up.
        intruder: PhilosopherId,
    },
    /// A philosopher put down a fork it was not holding.
    #[error("#{seq}: {philosopher} put down {fork} without holding it")]
    ForeignRelease {
        /// Position of the offending event.
        seq: u64,
        /// The fork.
        fork: ForkId,
        /// The philosopher that released it.
        philosopher: PhilosopherId,
    },
}

/// Records every event it observes, in arrival order.
///
/// Sequence numbers are assigned under the log's lock. Forks report an
/// acquisition only after taking the fork and a release only before giving it
/// up, so for any fork the log order matches the real hand-over order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<RecordedEvent>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Counts events matching a predicate.
    pub fn count(&self, mut predicate: impl FnMut(&DiningEvent) -> bool) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|recorded| predicate(&recorded.event))
            .count()
    }

    /// Replays the log and checks that no fork ever had two holders and that
    /// only the holder ever released a fork.
    pub fn check_mutual_exclusion(&self) -> Result<(), ExclusionViolation> {
        let events = self.events.lock();
        let mut holders: BTreeMap<ForkId, PhilosopherId> = BTreeMap::new();
        for recorded in events.iter() {
            let philosopher = recorded.event.philosopher;
            match recorded.event.kind {
                EventKind::ForkAcquired(fork) => {
                    if let Some(&holder) = holders.get(&fork) {
                        return Err(ExclusionViolation::DoubleHold {
                            seq: recorded.seq,
                            fork,
                            holder,
                            intruder: philosopher,
                        });
                    }
                    holders.insert(fork, philosopher);
                }
                EventKind::ForkReleased(fork) => {
                    if holders.get(&fork) != Some(&philosopher) {
                        return Err(ExclusionViolation::ForeignRelease {
                            seq: recorded.seq,
                            fork,
                            philosopher,
                        });
                    }
                    holders.remove(&fork);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Replays gate events and returns the lowest and highest number of
    /// permits outstanding at any point, starting from zero.
    #[must_use]
    pub fn gate_occupancy_range(&self) -> (i64, i64) {
        let events = self.events.lock();
        let (mut current, mut low, mut high) = (0_i64, 0_i64, 0_i64);
        for recorded in events.iter() {
            match recorded.event.kind {
                EventKind::GateEntered => current += 1,
                EventKind::GateLeft => current -= 1,
                _ => continue,
            }
            low = low.min(current);
            high = high.max(current);
        }
        (low, high)
    }

    /// Counts meals that began while the eater held exactly two forks.
    #[must_use]
    pub fn matched_pairs(&self) -> u64 {
        let events = self.events.lock();
        let mut held: BTreeMap<PhilosopherId, BTreeSet<ForkId>> = BTreeMap::new();
        let mut pairs = 0;
        for recorded in events.iter() {
            let forks = held.entry(recorded.event.philosopher).or_default();
            match recorded.event.kind {
                EventKind::ForkAcquired(fork) => {
                    forks.insert(fork);
                }
                EventKind::ForkReleased(fork) => {
                    forks.remove(&fork);
                }
                EventKind::Eating { .. } if forks.len() == 2 => pairs += 1,
                _ => {}
            }
        }
        pairs
    }
}

impl Observer for EventLog {
    fn on_event(&self, event: &DiningEvent) {
        let mut events = self.events.lock();
        let seq = events.len() as u64;
        events.push(RecordedEvent {
            seq,
            event: event.clone(),
        });
    }
}
