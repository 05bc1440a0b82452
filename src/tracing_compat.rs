//! Optional tracing integration.
//!
//! With the `tracing-integration` feature enabled (the default), these are the
//! `tracing` crate's macros. Without it, every macro expands to nothing so the
//! hot paths carry no logging cost.

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    macro_rules! noop_event {
        ($($arg:tt)*) => {{}};
    }

    pub(crate) use noop_event as trace;
    pub(crate) use noop_event as debug;
    pub(crate) use noop_event as info;
    pub(crate) use noop_event as warn;
    pub(crate) use noop_event as error;
}

#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop::{debug, error, info, trace, warn};
