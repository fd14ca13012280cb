//! Zero-argument memoizing supplier.
//!
//! [`StableSupplier`] pairs one [`StableValue`] with the function that
//! computes it, so callers only ever say "give me the value".

use core::fmt;

use crate::error::{Result, StableError};
use crate::value::StableValue;

/// Creates a [`StableSupplier`] computing its value with `f`.
#[inline]
pub fn supplier<T, F>(f: F) -> StableSupplier<T, F>
where
   F: Fn() -> T,
{
   StableSupplier::new(f)
}

/// A value computed by `F` on first request and cached forever after.
///
/// `F` runs successfully at most once over the supplier's lifetime. A call
/// that panics (or, for fallible suppliers, returns `Err`) caches nothing,
/// so a later call runs `F` again.
///
/// Suppliers are ordinary owned values: put one in a `static`, a struct
/// field or an `Arc` depending on the sharing needed.
///
/// ```
/// use stable_value::StableSupplier;
///
/// static GREETING: StableSupplier<String> = StableSupplier::new(|| "hello".repeat(2));
///
/// assert_eq!(GREETING.get().map(String::as_str), Ok("hellohello"));
/// assert!(GREETING.is_done());
/// ```
pub struct StableSupplier<T, F = fn() -> T> {
   value: StableValue<T>,
   init: F,
}

impl<T, F> StableSupplier<T, F> {
   /// Creates a supplier; nothing is computed until the first [`get`](Self::get).
   #[inline]
   #[must_use]
   pub const fn new(init: F) -> Self {
      Self {
         value: StableValue::new(),
         init,
      }
   }

   /// Checks if the value has been computed. Never blocks.
   #[inline]
   pub fn is_done(&self) -> bool {
      self.value.is_done()
   }

   /// Returns the value only if it was already computed.
   #[inline]
   pub fn get_if_done(&self) -> Option<&T> {
      self.value.get()
   }

   /// Returns the value, computing it with a fallible `F`.
   ///
   /// An `Err` from `F` is handed back unchanged and nothing is cached.
   #[inline]
   pub fn try_get<E>(&self) -> Result<&T, E>
   where
      F: Fn() -> Result<T, E>,
      E: From<StableError>,
   {
      self.value.get_or_try_init(&self.init)
   }

   /// Async flavor of [`try_get`](Self::try_get).
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn try_get_async<E>(&self) -> Result<&T, E>
   where
      F: Fn() -> Result<T, E>,
      E: From<StableError>,
   {
      self
         .value
         .get_or_try_init_async(|| async { (self.init)() })
         .await
   }

   /// Consumes the supplier, returning the value if it was computed.
   #[inline]
   pub fn into_inner(self) -> Option<T> {
      self.value.into_inner()
   }
}

impl<T, F> StableSupplier<T, F>
where
   F: Fn() -> T,
{
   /// Returns the value, computing it on first call.
   ///
   /// Concurrent first calls block until the single running computation
   /// finishes. A panic in `F` reaches the caller that ran it unchanged.
   ///
   /// # Errors
   ///
   /// [`StableError::CyclicInitialization`] if `F` requests this supplier.
   #[inline]
   pub fn get(&self) -> Result<&T> {
      self.value.get_or_init(&self.init)
   }

   /// Async flavor of [`get`](Self::get): waits for a running computation
   /// without blocking the runtime. `F` itself runs synchronously.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_async(&self) -> Result<&T> {
      self
         .value
         .get_or_init_async(|| async { (self.init)() })
         .await
   }
}

impl<T: fmt::Debug, F> fmt::Debug for StableSupplier<T, F> {
   /// Shows the cached value without computing it.
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("StableSupplier");
      match self.value.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<unset>")),
      };
      d.finish()
   }
}
