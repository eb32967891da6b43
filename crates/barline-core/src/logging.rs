//! Logging shims.
//!
//! With the `tracing` feature the macros forward to `tracing`. Without it they
//! expand to nothing, so `barline-core` stays dependency-light for consumers
//! that do not want a logging facade.

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace};

/// No-op `debug!` used when the `tracing` feature is disabled.
#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{}};
}

/// No-op `trace!` used when the `tracing` feature is disabled.
#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {{}};
}
