//! Logging shim over `tracing`.
//!
//! Slow-path events only. With the `tracing` feature disabled every macro
//! expands to nothing, so call sites need no `cfg` of their own.

macro_rules! slot_trace {
   ($($arg:tt)*) => {
      #[cfg(feature = "tracing")]
      ::tracing::trace!(target: "stable_value", $($arg)*);
   };
}

macro_rules! slot_debug {
   ($($arg:tt)*) => {
      #[cfg(feature = "tracing")]
      ::tracing::debug!(target: "stable_value", $($arg)*);
   };
}
