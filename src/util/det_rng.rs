//! Small deterministic RNG for think, eat, and backoff delays.
//!
//! Each philosopher owns one generator, so no synchronization is needed on the
//! hot path and a seeded run draws the same delays every time.

use std::time::Duration;

/// xorshift64* generator.
#[derive(Debug, Clone)]
pub struct DetRng {
    state: u64,
}

impl DetRng {
    /// Creates a generator from a seed. A zero seed is remapped, since
    /// xorshift never leaves the all-zero state.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    /// Returns the next `u64`.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Returns a value uniformly drawn from `min..=max`.
    ///
    /// If `max < min` the bounds are swapped.
    pub fn next_in(&mut self, min: u64, max: u64) -> u64 {
        let (lo, hi) = if max < min { (max, min) } else { (min, max) };
        let span = hi - lo;
        if span == u64::MAX {
            return self.next_u64();
        }
        lo + self.next_u64() % (span + 1)
    }

    /// Returns a duration uniformly drawn from `min_ms..=max_ms` milliseconds.
    pub fn millis_in(&mut self, min_ms: u64, max_ms: u64) -> Duration {
        Duration::from_millis(self.next_in(min_ms, max_ms))
    }
}
