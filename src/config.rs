//! Table configuration.
//!
//! [`TableConfig`] carries every tunable of a dinner: strategy, seat count,
//! meals per philosopher, delay ranges, the timed-retry policy, an optional
//! RNG seed, and an optional run deadline. Defaults reproduce the classic
//! five-seat, five-meal dinner.
//!
//! With the `config-file` feature a config can be loaded from TOML:
//!
//! ```toml
//! strategy = "timed_retry"
//! seed = 7
//!
//! [think]
//! min_ms = 10
//! max_ms = 20
//!
//! [retry]
//! attempt_timeout_ms = 50
//! max_attempts = 100
//! ```

use crate::types::Strategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of seats (philosophers and forks).
pub const DEFAULT_SEATS: usize = 5;
/// Default number of meals each philosopher eats before leaving.
pub const DEFAULT_MEALS: u32 = 5;

/// Errors from validating or loading a [`TableConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A ring needs at least two seats; with one, both forks are the same.
    #[error("a table needs at least 2 seats, got {0}")]
    TooFewSeats(usize),
    /// Seat indices must fit in a `u32`.
    #[error("too many seats: {0}")]
    TooManySeats(usize),
    /// Each philosopher must eat at least once.
    #[error("meals per philosopher must be at least 1")]
    NoMeals,
    /// A delay range had its bounds inverted.
    #[error("invalid {name} range: min {min_ms}ms > max {max_ms}ms")]
    InvalidRange {
        /// Which range was rejected.
        name: &'static str,
        /// Lower bound in milliseconds.
        min_ms: u64,
        /// Upper bound in milliseconds.
        max_ms: u64,
    },
    /// Timed attempts need a positive timeout.
    #[error("attempt timeout must be positive")]
    ZeroAttemptTimeout,
    /// An attempt limit of zero would never try.
    #[error("max attempts must be at least 1")]
    ZeroMaxAttempts,
    /// A zero deadline would cancel the dinner before it starts.
    #[error("deadline must be positive")]
    ZeroDeadline,
    /// The config file could not be parsed.
    #[cfg(feature = "config-file")]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The config file could not be read.
    #[cfg(feature = "config-file")]
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that failed.
        path: std::path::PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// An inclusive range of delays, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelayRange {
    /// Shortest delay.
    pub min_ms: u64,
    /// Longest delay.
    pub max_ms: u64,
}

impl DelayRange {
    /// Creates a range of `min_ms..=max_ms` milliseconds.
    #[must_use]
    pub const fn millis(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Creates a degenerate range that always yields `ms`.
    #[must_use]
    pub const fn fixed(ms: u64) -> Self {
        Self::millis(ms, ms)
    }

    fn validate(self, name: &'static str) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::InvalidRange {
                name,
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(())
    }
}

/// Policy for the timed-retry strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// How long each fork attempt may wait.
    pub attempt_timeout_ms: u64,
    /// Random pause between failed attempts.
    pub backoff: DelayRange,
    /// Attempts allowed per meal; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryConfig {
    /// Returns the per-fork attempt timeout.
    #[must_use]
    pub const fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 300,
            backoff: DelayRange::millis(50, 200),
            max_attempts: None,
        }
    }
}

/// Configuration of a dinner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    /// How philosophers acquire their forks.
    pub strategy: Strategy,
    /// Number of philosophers, equal to the number of forks.
    pub seats: usize,
    /// Meals each philosopher eats before leaving.
    pub meals: u32,
    /// Thinking delay range.
    pub think: DelayRange,
    /// Eating delay range.
    pub eat: DelayRange,
    /// Timed-retry policy, used only by [`Strategy::TimedRetry`].
    pub retry: RetryConfig,
    /// Seed for the delay generators; `None` draws from the OS.
    pub seed: Option<u64>,
    /// Cancel the dinner if it is still running after this long.
    pub deadline_ms: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            seats: DEFAULT_SEATS,
            meals: DEFAULT_MEALS,
            think: DelayRange::millis(200, 599),
            eat: DelayRange::millis(200, 599),
            retry: RetryConfig::default(),
            seed: None,
            deadline_ms: None,
        }
    }
}

impl TableConfig {
    /// Creates the default config with the given strategy.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Sets the strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the number of seats.
    #[must_use]
    pub fn with_seats(mut self, seats: usize) -> Self {
        self.seats = seats;
        self
    }

    /// Sets the number of meals per philosopher.
    #[must_use]
    pub fn with_meals(mut self, meals: u32) -> Self {
        self.meals = meals;
        self
    }

    /// Sets the thinking delay range.
    #[must_use]
    pub fn with_think(mut self, think: DelayRange) -> Self {
        self.think = think;
        self
    }

    /// Sets the eating delay range.
    #[must_use]
    pub fn with_eat(mut self, eat: DelayRange) -> Self {
        self.eat = eat;
        self
    }

    /// Sets the timed-retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the run deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Returns the run deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Checks the config for values no dinner can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seats < 2 {
            return Err(ConfigError::TooFewSeats(self.seats));
        }
        if u32::try_from(self.seats).is_err() {
            return Err(ConfigError::TooManySeats(self.seats));
        }
        if self.meals == 0 {
            return Err(ConfigError::NoMeals);
        }
        self.think.validate("think")?;
        self.eat.validate("eat")?;
        self.retry.backoff.validate("backoff")?;
        if self.retry.attempt_timeout_ms == 0 {
            return Err(ConfigError::ZeroAttemptTimeout);
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        if self.deadline_ms == Some(0) {
            return Err(ConfigError::ZeroDeadline);
        }
        Ok(())
    }

    /// Parses and validates a config from TOML. Missing keys take defaults.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML config file.
    #[cfg(feature = "config-file")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}
