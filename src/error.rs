//! Error types surfaced by stable values and stable collections.
//!
//! Errors raised by a user-supplied compute function are never represented
//! here: infallible functions unwind through the cell unchanged, and fallible
//! ones hand their own error type back to the caller (see
//! [`StableValue::get_or_try_init`](crate::StableValue::get_or_try_init)).

/// Errors produced by the stable value machinery itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StableError {
   /// A stable list was requested with a negative length.
   #[error("size < 0: {size}")]
   NegativeSize { size: i64 },

   /// An index outside `0..len` was used on a stable list or one of its views.
   #[error("index {index} out of bounds for length {len}")]
   IndexOutOfBounds { index: usize, len: usize },

   /// A sub-range `from..to` does not fit in a sequence of length `len`.
   #[error("range {from}..{to} out of bounds for length {len}")]
   RangeOutOfBounds { from: usize, to: usize, len: usize },

   /// A compute function requested, directly or transitively, the very slot
   /// it is computing.
   #[error("cyclic definition")]
   CyclicInitialization,

   /// A mutating operation was attempted on an unmodifiable stable collection.
   #[error("{operation} is not supported: stable collections are unmodifiable")]
   Unsupported { operation: &'static str },
}

impl StableError {
   #[inline]
   pub(crate) const fn unsupported(operation: &'static str) -> Self {
      Self::Unsupported { operation }
   }

   #[inline]
   pub(crate) const fn out_of_bounds(index: usize, len: usize) -> Self {
      Self::IndexOutOfBounds { index, len }
   }
}

/// Result alias used throughout the crate.
pub type Result<T, E = StableError> = core::result::Result<T, E>;

/// Unwraps a lookup result for APIs that cannot return `Result`
/// (iterators, `Index`, formatting). Panics with the error message.
#[inline]
#[track_caller]
pub(crate) fn realize<T>(result: Result<T>) -> T {
   match result {
      Ok(value) => value,
      Err(err) => panic!("{err}"),
   }
}
