//! Conventional lazy-initialization idioms used as comparison points.
//!
//! Every accessor here honors the same contract as `StableSupplier`: the
//! first access runs the initializer, every later access observes that same
//! value. Benchmarks time them side by side; `tests/parity.rs` checks the
//! contract.

#![allow(dead_code)]

use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use stable_value::StableSupplier;

/// Read access to a lazily initialized value.
pub trait LazyAccessor {
   type Value;

   /// Runs `f` on the value, initializing it first if needed.
   fn read<R>(&self, f: impl FnOnce(&Self::Value) -> R) -> R;
}

/// Takes a lock on every access, initialized or not.
pub struct SynchronizedAccessor<T, F> {
   slot: Mutex<Option<T>>,
   init: F,
}

impl<T, F: Fn() -> T> SynchronizedAccessor<T, F> {
   pub const fn new(init: F) -> Self {
      Self {
         slot: Mutex::new(None),
         init,
      }
   }
}

impl<T, F: Fn() -> T> LazyAccessor for SynchronizedAccessor<T, F> {
   type Value = T;

   fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
      let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
      f(slot.get_or_insert_with(&self.init))
   }
}

/// Double-checked locking: an atomic pointer fast path and a mutex guarding
/// the first publication.
pub struct DoubleCheckedAccessor<T, F> {
   value: AtomicPtr<T>,
   lock: Mutex<()>,
   init: F,
   _owns: PhantomData<T>,
}

impl<T, F: Fn() -> T> DoubleCheckedAccessor<T, F> {
   pub const fn new(init: F) -> Self {
      Self {
         value: AtomicPtr::new(ptr::null_mut()),
         lock: Mutex::new(()),
         init,
         _owns: PhantomData,
      }
   }

   fn get(&self) -> &T {
      let mut current = self.value.load(Ordering::Acquire);
      if current.is_null() {
         let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
         current = self.value.load(Ordering::Acquire);
         if current.is_null() {
            current = Box::into_raw(Box::new((self.init)()));
            self.value.store(current, Ordering::Release);
         }
      }
      // SAFETY: the pointer is published once, never replaced, and freed
      // only in `drop`.
      unsafe { &*current }
   }
}

impl<T, F: Fn() -> T> LazyAccessor for DoubleCheckedAccessor<T, F> {
   type Value = T;

   fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
      f(self.get())
   }
}

impl<T, F> Drop for DoubleCheckedAccessor<T, F> {
   fn drop(&mut self) {
      let current = *self.value.get_mut();
      if !current.is_null() {
         // SAFETY: produced by `Box::into_raw` in `get`.
         drop(unsafe { Box::from_raw(current) });
      }
   }
}

/// Holder idiom: the standard library's once cell.
pub struct HolderAccessor<T, F> {
   holder: OnceLock<T>,
   init: F,
}

impl<T, F: Fn() -> T> HolderAccessor<T, F> {
   pub const fn new(init: F) -> Self {
      Self {
         holder: OnceLock::new(),
         init,
      }
   }
}

impl<T, F: Fn() -> T> LazyAccessor for HolderAccessor<T, F> {
   type Value = T;

   fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
      f(self.holder.get_or_init(&self.init))
   }
}

impl<T, F: Fn() -> T> LazyAccessor for StableSupplier<T, F> {
   type Value = T;

   fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
      f(self.get().expect("supplier is not cyclic"))
   }
}
