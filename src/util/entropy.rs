//! Seed sources.
//!
//! Unseeded runs draw from the OS; seeded runs derive one independent stream
//! per philosopher from the table seed.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns a seed from OS entropy.
///
/// Falls back to the wall clock if the OS source is unavailable.
#[must_use]
pub fn os_seed() -> u64 {
    getrandom::u64().unwrap_or_else(|_| {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        splitmix64(nanos as u64)
    })
}

/// Derives the seed of stream `index` from a base seed.
#[must_use]
pub fn derive_seed(base: u64, index: u64) -> u64 {
    splitmix64(base ^ splitmix64(index.wrapping_add(1)))
}

const fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
