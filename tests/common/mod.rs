#![allow(dead_code)]

use dining::{DelayRange, RetryConfig, Strategy, TableConfig};

pub use dining::test_utils::init_test_logging;

/// Five seats, five meals, millisecond-scale delays.
pub fn quick_config(strategy: Strategy, seed: u64) -> TableConfig {
    TableConfig::new(strategy)
        .with_think(DelayRange::millis(0, 3))
        .with_eat(DelayRange::millis(0, 3))
        .with_retry(RetryConfig {
            attempt_timeout_ms: 5,
            backoff: DelayRange::millis(1, 4),
            max_attempts: None,
        })
        .with_seed(seed)
}
