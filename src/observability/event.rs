//! Dining event types.

use crate::types::{CancelReason, ForkId, PhilosopherId};
use core::fmt;
use std::time::{Duration, Instant};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Started thinking before the given meal (1-based).
    Thinking {
        /// The meal being thought about.
        meal: u32,
    },
    /// Finished thinking and started acquiring forks.
    Hungry,
    /// Obtained a gate permit.
    GateEntered,
    /// About to return a gate permit.
    GateLeft,
    /// Now holds the fork.
    ForkAcquired(ForkId),
    /// About to release the fork.
    ForkReleased(ForkId),
    /// A timed attempt on the fork expired.
    ForkTimedOut(ForkId),
    /// Started eating the given meal (1-based).
    Eating {
        /// The meal being eaten.
        meal: u32,
    },
    /// Gave up an attempt and is pausing before the next one.
    BackingOff {
        /// The failed attempt number for the current meal (1-based).
        attempt: u32,
        /// How long the pause lasts.
        delay: Duration,
    },
    /// Ate every meal and left the table.
    Finished {
        /// Meals eaten.
        meals: u32,
    },
    /// Stopped early because of a cancellation request.
    Cancelled(CancelReason),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thinking { meal } => write!(f, "thinking (before meal {meal})"),
            Self::Hungry => write!(f, "hungry"),
            Self::GateEntered => write!(f, "entered gate"),
            Self::GateLeft => write!(f, "left gate"),
            Self::ForkAcquired(fork) => write!(f, "picked up {fork}"),
            Self::ForkReleased(fork) => write!(f, "put down {fork}"),
            Self::ForkTimedOut(fork) => write!(f, "timed out on {fork}"),
            Self::Eating { meal } => write!(f, "eating (meal {meal})"),
            Self::BackingOff { attempt, delay } => {
                write!(f, "backing off {}ms after attempt {attempt}", delay.as_millis())
            }
            Self::Finished { meals } => write!(f, "finished after {meals} meals"),
            Self::Cancelled(reason) => write!(f, "cancelled ({reason})"),
        }
    }
}

/// An event with its source and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiningEvent {
    /// The philosopher the event concerns.
    pub philosopher: PhilosopherId,
    /// When it happened.
    pub at: Instant,
    /// What happened.
    pub kind: EventKind,
}

impl DiningEvent {
    /// Creates an event stamped with the current instant.
    #[must_use]
    pub fn now(philosopher: PhilosopherId, kind: EventKind) -> Self {
        Self {
            philosopher,
            at: Instant::now(),
            kind,
        }
    }
}

impl fmt::Display for DiningEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.philosopher, self.kind)
    }
}
