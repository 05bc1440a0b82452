//! Identifier types for table entities.
//!
//! Forks and philosophers are both numbered by their seat at the table, but
//! they are distinct types so a fork index can never be passed where a
//! philosopher is expected.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Identifier of a fork.
///
/// Fork ids are dense (`0..seats`) and totally ordered; the ordered strategy
/// relies on that order to break circular wait.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForkId(u32);

impl ForkId {
    /// Creates a fork id from a seat index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the seat index of this fork.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the seat index as a `usize`, for slice access.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ForkId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForkId({})", self.0)
    }
}

impl fmt::Display for ForkId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// Identifier of a philosopher.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhilosopherId(u32);

impl PhilosopherId {
    /// Creates a philosopher id from a seat index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the seat index of this philosopher.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the forks this philosopher reaches for at a table of `seats`.
    ///
    /// The left fork shares the philosopher's index; the right fork is the
    /// next one around the ring.
    #[must_use]
    pub const fn forks(self, seats: u32) -> (ForkId, ForkId) {
        (ForkId(self.0), ForkId((self.0 + 1) % seats))
    }
}

impl fmt::Debug for PhilosopherId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhilosopherId({})", self.0)
    }
}

impl fmt::Display for PhilosopherId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}
