//! The stable value cell: one memoized slot.
//!
//! [`StableValue<T>`] is the unit every stable collection is built from. A
//! cell moves forward only, `Empty -> Computing -> Filled`, and once filled
//! its content is never replaced. Reading a filled cell is a single Acquire
//! load; computing it goes through the slot lock in [`crate::state`].

use core::cell::UnsafeCell;
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
use core::future::Future;
use core::{fmt, mem};

use crate::error::StableError;
use crate::state::{self, SlotLock};

/// A thread-safe cell whose content is computed at most once.
///
/// Concurrent callers racing on an empty cell are serialized: one of them
/// runs its compute function, the others block until it finishes. If the
/// computation fails (returns `Err`, panics, or its future is dropped) the
/// cell stays empty and a later caller retries.
///
/// A compute function that requests the cell it is computing gets
/// [`StableError::CyclicInitialization`] instead of a deadlock.
pub struct StableValue<T> {
   value: UnsafeCell<mem::MaybeUninit<T>>,
   lock: SlotLock,
}

impl<T> StableValue<T> {
   /// Creates a new, empty cell.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         lock: SlotLock::new(),
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
      }
   }

   /// Creates a cell that already holds `value`.
   #[inline]
   #[must_use]
   pub const fn with_value(value: T) -> Self {
      Self {
         lock: SlotLock::done(),
         value: UnsafeCell::new(mem::MaybeUninit::new(value)),
      }
   }

   /// Checks if the cell holds a value.
   ///
   /// This method never blocks.
   #[inline]
   pub fn is_done(&self) -> bool {
      self.lock.is_done()
   }

   /// Returns the content if the cell is filled.
   ///
   /// Returns `None` while the cell is empty or being computed. Never blocks
   /// and never triggers a computation.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_done() {
         // SAFETY: is_done() observed DONE with Acquire ordering.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// # Safety
   ///
   /// The cell must be filled.
   #[inline]
   unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_done(), "get_unchecked called on an empty StableValue");
      // SAFETY: The caller guarantees that the cell is filled, and filled
      // cells are never written again.
      unsafe { (*self.value.get()).assume_init_ref() }
   }

   /// Attempts to fill the cell with `value` without blocking.
   ///
   /// Fails with `Err(value)` if the cell is already filled or currently
   /// being computed, including by the calling thread.
   #[inline]
   pub fn try_set(&self, value: T) -> Result<&T, T> {
      let Some(guard) = self.lock.try_lock(state::current_owner()) else {
         return Err(value);
      };
      // SAFETY: We hold the slot, nobody else reads or writes the value.
      let refv = unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(refv)
   }

   /// Fills the cell with `value`, blocking while another thread computes it.
   ///
   /// Returns `Err(value)` if the cell ended up filled by someone else, or if
   /// it is being computed by the calling thread.
   pub fn set(&self, value: T) -> Result<(), T> {
      match self.lock.lock(state::current_owner()) {
         Ok(Some(guard)) => {
            // SAFETY: We hold the slot.
            unsafe { (*self.value.get()).write(value) };
            guard.commit();
            Ok(())
         }
         Ok(None) | Err(_) => Err(value),
      }
   }

   /// Returns the content, computing it with `f` if the cell is empty.
   ///
   /// Concurrent callers run at most one `f` at a time; the first one to
   /// succeed fills the cell for everybody. A panic in `f` propagates to this
   /// caller unchanged and leaves the cell empty.
   ///
   /// # Errors
   ///
   /// [`StableError::CyclicInitialization`] if `f`, directly or through other
   /// stable values, requests this cell again.
   #[inline]
   pub fn get_or_init<F>(&self, f: F) -> Result<&T, StableError>
   where
      F: FnOnce() -> T,
   {
      self.get_or_try_init(|| Ok(f()))
   }

   /// Returns the content, computing it with the fallible `f` if the cell is empty.
   ///
   /// - If filled, returns `Ok(&value)` without calling `f`.
   /// - Otherwise calls `f`:
   ///     - On `Ok(value)`, fills the cell and returns `Ok(&value)`.
   ///     - On `Err(e)`, returns `Err(e)` unchanged and leaves the cell empty.
   ///
   /// A cyclic request is reported through `E`'s `From<StableError>`.
   #[inline]
   pub fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Result<T, E>,
      E: From<StableError>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.try_initialize(f)?;
      // SAFETY: try_initialize returned Ok, so the cell is filled.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Returns the content, computing it with the future returned by `f` if
   /// the cell is empty.
   ///
   /// The future runs as its own logical owner: other tasks polled on the
   /// same worker thread wait for it instead of being reported as cyclic,
   /// while the future itself requesting this cell is.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[inline]
   pub async fn get_or_init_async<F, Fut>(&self, f: F) -> Result<&T, StableError>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = T>,
   {
      self
         .get_or_try_init_async(|| async move { Ok::<_, StableError>(f().await) })
         .await
   }

   /// Fallible flavor of [`get_or_init_async`](Self::get_or_init_async).
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_or_try_init_async<F, Fut, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<T, E>>,
      E: From<StableError>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      let owner = state::task_owner();
      state::with_task_owner(owner, self.try_initialize_async(owner, f)).await?;
      // SAFETY: try_initialize_async returned Ok, so the cell is filled.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Consumes the cell, returning its content if filled.
   #[inline]
   pub fn into_inner(self) -> Option<T> {
      let this = mem::ManuallyDrop::new(self);
      if this.is_done() {
         // SAFETY: The cell is filled and `this` is never dropped, so the
         // value is moved out exactly once.
         Some(unsafe { (*this.value.get()).assume_init_read() })
      } else {
         None
      }
   }

   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[cold]
   async fn try_initialize_async<F, Fut, E>(&self, owner: usize, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<T, E>>,
      E: From<StableError>,
   {
      let Some(guard) = self.lock.lock_async(owner).await? else {
         return Ok(()); // Filled by another task while we waited
      };
      let value = f().await?; // On failure or cancellation the guard resets the slot.
      // SAFETY: We hold the slot.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }

   #[cold]
   fn try_initialize<F, E>(&self, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Result<T, E>,
      E: From<StableError>,
   {
      let Some(guard) = self.lock.lock(state::current_owner())? else {
         return Ok(()); // Filled by another thread while we waited
      };
      let value = f()?; // On failure or unwind the guard resets the slot.
      // SAFETY: We hold the slot.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }
}

// SAFETY: Values are written once by the owning thread and then shared by
// reference, so `T` must be both `Send` and `Sync`.
unsafe impl<T: Sync + Send> Sync for StableValue<T> {}
// SAFETY: Moving the cell moves the `T` it owns.
unsafe impl<T: Send> Send for StableValue<T> {}

impl<T> Default for StableValue<T> {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T> From<T> for StableValue<T> {
   /// Creates a filled cell.
   #[inline]
   fn from(value: T) -> Self {
      Self::with_value(value)
   }
}

impl<T> From<Option<T>> for StableValue<T> {
   /// Creates a filled cell from `Some(value)`, an empty one from `None`.
   fn from(value: Option<T>) -> Self {
      match value {
         Some(value) => Self::with_value(value),
         None => Self::new(),
      }
   }
}

impl<T: fmt::Display> fmt::Display for StableValue<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self.get() {
         Some(v) => fmt::Display::fmt(v, f),
         None => f.write_str("<unset>"),
      }
   }
}

impl<T: fmt::Debug> fmt::Debug for StableValue<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("StableValue");
      match self.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<unset>")),
      };
      d.finish()
   }
}

impl<T: Clone> Clone for StableValue<T> {
   /// Clones the content if filled; an empty or in-flight cell clones as empty.
   #[inline]
   fn clone(&self) -> Self {
      match self.get() {
         Some(value) => Self::with_value(value.clone()),
         None => Self::new(),
      }
   }
}

impl<T: PartialEq> PartialEq for StableValue<T> {
   #[inline]
   fn eq(&self, other: &Self) -> bool {
      self.get() == other.get()
   }
}

impl<T: Eq> Eq for StableValue<T> {}

impl<T> Drop for StableValue<T> {
   #[inline]
   fn drop(&mut self) {
      if self.is_done() {
         // SAFETY: Exclusive access and the cell is filled.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
