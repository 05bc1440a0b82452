//! Fork acquisition strategies.

use core::fmt;
use core::str::FromStr;
use crate::tracing_compat::warn;
use serde::{Deserialize, Deserializer, Serialize};

/// How a philosopher acquires both forks.
///
/// The strategy is chosen once for the whole table and never changes while
/// a philosopher is running. Deserializing accepts every name
/// [`FromStr`] does and falls back to [`Strategy::Gated`] for anything else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// A butler gate admits at most `seats - 1` philosophers to the
    /// acquisition phase, then each takes left and right in turn.
    #[default]
    Gated,
    /// Resource hierarchy: always take the lower-numbered fork first.
    Ordered,
    /// Bounded-time attempts on each fork, releasing and backing off for a
    /// random delay whenever the second fork is not obtained.
    TimedRetry,
}

impl Strategy {
    /// All strategies, in declaration order.
    pub const ALL: [Self; 3] = [Self::Gated, Self::Ordered, Self::TimedRetry];

    /// Returns the canonical name of the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gated => "gated",
            Self::Ordered => "ordered",
            Self::TimedRetry => "timed_retry",
        }
    }

    /// Returns true if this strategy needs a gate.
    #[must_use]
    pub const fn uses_gate(self) -> bool {
        matches!(self, Self::Gated)
    }

    /// Parses a strategy name, falling back to [`Strategy::Gated`] when the
    /// name is absent or not recognised.
    #[must_use]
    pub fn parse_lenient(name: Option<&str>) -> Self {
        name.and_then(|name| name.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a strategy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy `{0}`")]
pub struct ParseStrategyError(pub String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gated" | "butler" => Ok(Self::Gated),
            "ordered" | "ordering" | "resource" | "resource_hierarchy" => Ok(Self::Ordered),
            "timed_retry" | "timed-retry" | "trylock" | "try_lock" | "try-lock" | "timeout" => {
                Ok(Self::TimedRetry)
            }
            _ => Err(ParseStrategyError(s.to_owned())),
        }
    }
}

impl<'de> Deserialize<'de> for Strategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        let strategy = Self::parse_lenient(Some(&name));
        if name.parse::<Self>().is_err() {
            warn!(name = %name, fallback = %strategy, "unknown strategy");
        }
        Ok(strategy)
    }
}
