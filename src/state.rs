//! Per-slot synchronization state for stable values.
//!
//! Every memoized slot (a scalar, one list index, one map key) owns a
//! [`SlotLock`]. It implements the slot lifecycle
//! `Empty -> Computing(owner) -> Filled` with atomic operations and
//! futex-based waiting via `parking_lot_core`.
//!
//! The state is packed into a single `AtomicU8` with the following layout:
//! - Bit 0: DONE - Slot is filled
//! - Bit 1: LOCKED - Slot is being computed
//! - Bit 2: WAITING - At least one thread is waiting
//! - Bits 3-7: EPOCH - Generation counter so waiters observe every transition
//!
//! Next to it sits the identity of the computing owner. It is only meaningful
//! while LOCKED is set and is used for one thing: refusing a request for a
//! slot that the requesting thread (or task) is itself computing, which would
//! otherwise park forever on a lock it already holds.

use core::mem;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

use crate::error::StableError;

/// Owner value meaning "nobody".
const NO_OWNER: usize = 0;

/// Source of owner identities, shared by threads and async tasks.
static NEXT_OWNER: AtomicUsize = AtomicUsize::new(1);

std::thread_local! {
   static THREAD_OWNER: usize = NEXT_OWNER.fetch_add(1, Ordering::Relaxed);
}

#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
tokio::task_local! {
   static TASK_OWNER: usize;
}

/// Identity of the caller for reentrancy checks.
///
/// Inside an async compute scope this is the logical task identity, so that
/// other tasks polled on the same worker thread are not mistaken for the
/// owner. Everywhere else it is the identity of the current thread.
#[inline]
pub(crate) fn current_owner() -> usize {
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   if let Ok(owner) = TASK_OWNER.try_with(|owner| *owner) {
      return owner;
   }
   thread_owner()
}

/// Identity of the current thread, ignoring any async compute scope.
#[inline]
fn thread_owner() -> usize {
   THREAD_OWNER.with(|owner| *owner)
}

/// Runs `fut` as the logical task `owner`.
///
/// Nested scopes reuse the enclosing task identity, so a compute future that
/// awaits another slot which in turn requests the first one is still seen as
/// the same owner.
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
pub(crate) async fn with_task_owner<Fut>(owner: usize, fut: Fut) -> Fut::Output
where
   Fut: core::future::Future,
{
   TASK_OWNER.scope(owner, fut).await
}

/// Identity to use for a new async compute scope.
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
pub(crate) fn task_owner() -> usize {
   TASK_OWNER
      .try_with(|owner| *owner)
      .unwrap_or_else(|_| NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
}

/// `block_in_place` panics outside the multi-threaded runtime.
#[cfg(feature = "async-tokio-mt")]
fn can_block_in_place() -> bool {
   use tokio::runtime::{Handle, RuntimeFlavor};
   Handle::try_current().is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
}

/// Outcome of a single locking attempt.
enum Step<'a> {
   /// Slot is already filled.
   Done,
   /// Caller became the computing owner.
   Acquired(SlotGuard<'a>),
   /// Another owner is computing; carries the state to wait on.
   Busy(u8),
   /// Caller is already the computing owner of this slot.
   Reentrant,
}

/// Atomic lifecycle state of a single slot.
pub(crate) struct SlotLock {
   state: AtomicU8,
   owner: AtomicUsize,
}

impl SlotLock {
   /// Bit flag: Slot is filled.
   const DONE: u8 = 1;
   /// Bit flag: Slot is being computed.
   const LOCKED: u8 = 2;
   /// Bit flag: At least one thread is waiting for the computation.
   const WAITING: u8 = 4;
   /// Start of epoch bits.
   const EPOCH_1: u8 = 8;
   /// Mask for epoch bits.
   const EPOCH_MASK: u8 = !(Self::DONE | Self::LOCKED | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(current_state: u8) -> u8 {
      (current_state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates an empty slot.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self {
         state: AtomicU8::new(0),
         owner: AtomicUsize::new(NO_OWNER),
      }
   }

   /// Creates a slot that is already filled.
   #[inline]
   pub(crate) const fn done() -> Self {
      Self {
         state: AtomicU8::new(Self::DONE),
         owner: AtomicUsize::new(NO_OWNER),
      }
   }

   #[inline]
   fn addr(&self) -> usize {
      self.state.as_ptr() as usize
   }

   #[inline]
   fn notify_all(&self) {
      // SAFETY: `park` and `unpark_all` both key on the address of `self.state`.
      unsafe {
         parking_lot_core::unpark_all(self.addr(), DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the calling thread until the state moves away from `expected_state`.
   #[inline]
   fn wait(&self, expected_state: u8) {
      // SAFETY: See `notify_all`.
      unsafe {
         // The validate closure runs under the bucket lock, so a transition
         // racing with us is never missed. Spurious wake-ups are fine: every
         // caller re-checks the state in a loop.
         let _ = parking_lot_core::park(
            self.addr(),
            || self.state.load(Ordering::Acquire) == expected_state,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Publishes the slot as filled and wakes waiters.
   ///
   /// Release ordering makes the value written by the owner visible to
   /// every thread that later observes DONE with an Acquire load.
   #[inline]
   fn set_done(&self) {
      self.owner.store(NO_OWNER, Ordering::Relaxed);
      let current_state = self.state.load(Ordering::Relaxed);
      let new_state = Self::DONE | Self::next_epoch(current_state);
      let prev_state = self.state.swap(new_state, Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Returns the slot to empty after a failed computation and wakes waiters,
   /// one of which will retry.
   #[inline]
   fn set_empty(&self) {
      self.owner.store(NO_OWNER, Ordering::Relaxed);
      let current_state = self.state.load(Ordering::Relaxed);
      let prev_state = self
         .state
         .swap(Self::next_epoch(current_state), Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Checks whether the slot is filled. An Acquire load here synchronizes
   /// with the Release in `set_done`, so the value may be read afterwards.
   #[inline]
   pub(crate) fn is_done(&self) -> bool {
      self.state.load(Ordering::Acquire) & Self::DONE != 0
   }

   /// Single locking attempt on behalf of `owner`.
   ///
   /// With `nowait` set, a held lock is reported without flagging WAITING.
   fn lock_step(&self, owner: usize, nowait: bool) -> Step<'_> {
      loop {
         let current_state = self.state.load(Ordering::Acquire);
         if current_state & Self::DONE != 0 {
            return Step::Done;
         }

         if current_state & Self::LOCKED == 0 {
            let new_state = current_state | Self::LOCKED;
            match self.state.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => {
                  self.owner.store(owner, Ordering::Relaxed);
                  slot_trace!(slot = self.addr(), owner, "slot claimed for computation");
                  return Step::Acquired(SlotGuard::new(self));
               }
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         // Held. Only the owner itself ever stores its own identity here, so a
         // match means the caller is re-entering its own computation. A thread
         // identity is stored only by a synchronous computation, which keeps its
         // thread until it finishes: any request from that thread, async scope
         // or not, is nested inside it.
         let holder = self.owner.load(Ordering::Relaxed);
         if holder == owner || holder == thread_owner() {
            slot_debug!(slot = self.addr(), owner, "cyclic definition detected");
            return Step::Reentrant;
         }

         if !nowait && current_state & Self::WAITING == 0 {
            let new_state = current_state | Self::WAITING;
            match self.state.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Step::Busy(new_state),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }
         return Step::Busy(current_state);
      }
   }

   /// Becomes the computing owner of the slot, blocking while another owner
   /// is computing.
   ///
   /// Returns `Ok(None)` when the slot is (or became) filled, and fails with
   /// [`StableError::CyclicInitialization`] before ever blocking if `owner`
   /// already holds the slot.
   pub(crate) fn lock(&self, owner: usize) -> Result<Option<SlotGuard<'_>>, StableError> {
      loop {
         match self.lock_step(owner, false) {
            Step::Done => return Ok(None),
            Step::Acquired(guard) => return Ok(Some(guard)),
            Step::Reentrant => return Err(StableError::CyclicInitialization),
            Step::Busy(state) => self.wait(state),
         }
      }
   }

   /// Async flavor of [`lock`](Self::lock).
   ///
   /// Yields to the runtime first. On the multi-threaded runtime it then
   /// falls back to parking inside `block_in_place`; elsewhere it keeps yielding.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub(crate) async fn lock_async(
      &self,
      owner: usize,
   ) -> Result<Option<SlotGuard<'_>>, StableError> {
      loop {
         for _ in 0..16 {
            match self.lock_step(owner, false) {
               Step::Done => return Ok(None),
               Step::Acquired(guard) => return Ok(Some(guard)),
               Step::Reentrant => return Err(StableError::CyclicInitialization),
               Step::Busy(state) => {
                  for _ in 0..32 {
                     tokio::task::yield_now().await;
                     if self.state.load(Ordering::Relaxed) != state {
                        break;
                     }
                  }
               }
            }
         }

         #[cfg(feature = "async-tokio-mt")]
         if can_block_in_place() {
            return match self.lock_step(owner, false) {
               Step::Done => Ok(None),
               Step::Acquired(guard) => Ok(Some(guard)),
               Step::Reentrant => Err(StableError::CyclicInitialization),
               Step::Busy(state) => tokio::task::block_in_place(|| {
                  self.wait(state);
                  self.lock(owner)
               }),
            };
         }
      }
   }

   /// Attempts to become the computing owner without blocking.
   ///
   /// Returns `None` if the slot is filled or held by anyone, the caller included.
   #[inline]
   pub(crate) fn try_lock(&self, owner: usize) -> Option<SlotGuard<'_>> {
      match self.lock_step(owner, true) {
         Step::Acquired(guard) => Some(guard),
         Step::Done | Step::Busy(_) | Step::Reentrant => None,
      }
   }
}

/// Proof of ownership of a slot in the Computing state.
///
/// Must be [`commit`](Self::commit)ted once the value is written. Dropping it
/// instead (an `Err` returned by the compute function, a panic unwinding
/// through it, a cancelled future) returns the slot to Empty.
pub(crate) struct SlotGuard<'a> {
   lock: &'a SlotLock,
}

impl<'a> SlotGuard<'a> {
   #[inline(always)]
   const fn new(lock: &'a SlotLock) -> Self {
      Self { lock }
   }

   /// Marks the slot as filled, consuming the guard.
   #[inline(always)]
   pub(crate) fn commit(self) {
      self.lock.set_done();
      mem::forget(self);
   }
}

impl Drop for SlotGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      slot_trace!(slot = self.lock.addr(), "computation abandoned, slot reset to empty");
      self.lock.set_empty();
   }
}
