//! Error types.
//!
//! Timeouts on a timed fork attempt are not errors: they are an expected
//! outcome reported as `None`. Everything here ends a philosopher's run (or
//! prevents a table from being built).

use crate::config::ConfigError;
use crate::types::{CancelReason, PhilosopherId};

/// Errors produced by forks, gates, philosophers, and the table.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A blocking wait or sleep observed a cancellation request.
    #[error("cancelled ({0})")]
    Cancelled(CancelReason),

    /// A timed-retry philosopher hit its attempt limit without eating.
    #[error("{philosopher} gave up after {attempts} attempts")]
    RetriesExhausted {
        /// The philosopher that gave up.
        philosopher: PhilosopherId,
        /// Number of attempts made for the unfinished meal.
        attempts: u32,
    },

    /// A philosopher thread panicked. Its guards were unwound, so nothing it
    /// held stays held.
    #[error("{0} panicked")]
    Panicked(PhilosopherId),

    /// The table already hosted its dinner.
    #[error("table has already served its dinner")]
    AlreadyServed,

    /// The table configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A philosopher thread could not be spawned.
    #[error("failed to spawn thread for {philosopher}: {source}")]
    Spawn {
        /// The philosopher whose thread failed to start.
        philosopher: PhilosopherId,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns true if this error is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns the cancellation reason, if this error is a cancellation.
    #[must_use]
    pub const fn cancel_reason(&self) -> Option<&CancelReason> {
        match self {
            Self::Cancelled(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Convenience alias for results in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_accessors() {
        let err = Error::Cancelled(CancelReason::timeout());
        assert!(err.is_cancelled());
        assert_eq!(err.cancel_reason(), Some(&CancelReason::timeout()));

        let err = Error::Panicked(PhilosopherId::new(1));
        assert!(!err.is_cancelled());
        assert!(err.cancel_reason().is_none());
    }

    #[test]
    fn messages_name_the_philosopher() {
        let err = Error::RetriesExhausted {
            philosopher: PhilosopherId::new(3),
            attempts: 12,
        };
        assert_eq!(err.to_string(), "P3 gave up after 12 attempts");
        assert_eq!(
            Error::Cancelled(CancelReason::user("stop")).to_string(),
            "cancelled (user: stop)"
        );
    }
}
