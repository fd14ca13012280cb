//! Compute-once, cache-forever values and collections.
//!
//! This crate provides memoizing containers whose content is computed lazily
//! by a user-supplied function, at most once per slot, no matter how many
//! threads ask for it concurrently:
//!
//! - [`StableValue<T>`]: the low-level cell. One slot, filled once.
//! - [`StableSupplier<T, F>`]: a cell paired with the zero-argument function
//!   computing it.
//! - [`StableList<T, F>`]: a fixed-length list whose element `i` is `f(i)`.
//! - [`StableMap<K, V, F>`]: a map over a fixed key set whose value for `k`
//!   is `f(&k)`.
//!
//! All of them share the same guarantees:
//!
//! - **Lock-free fast path**: reading a computed slot is a single Acquire load.
//! - **Per-slot exclusion**: only callers wanting the same uncomputed slot
//!   wait for each other, using futex-based parking.
//! - **Cyclic-definition detection**: a compute function that requests its
//!   own slot gets [`StableError::CyclicInitialization`] instead of a deadlock.
//! - **Failures are not cached**: an `Err` or a panic from the compute
//!   function reaches the caller that ran it unchanged and leaves the slot
//!   empty for a later retry.
//! - **Unmodifiable**: the shape of a collection (length, key set) is fixed at
//!   construction; every mutating operation fails with
//!   [`StableError::Unsupported`].
//!
//! # Examples
//!
//! ## Stable supplier
//!
//! ```rust
//! use stable_value::supplier;
//!
//! let config = supplier(|| "production".to_string());
//!
//! assert_eq!(config.get_if_done(), None);
//! assert_eq!(config.get().unwrap(), "production");
//! assert_eq!(config.get_if_done().map(String::as_str), Some("production"));
//! ```
//!
//! ## Stable list and map
//!
//! ```rust
//! use stable_value::{list, map, Sequence, StableError};
//!
//! let labels = list(3, |i| format!("item {i}"));
//! assert_eq!(labels.get(1).unwrap(), "item 1");
//! assert_eq!(labels.get(3), Err(StableError::IndexOutOfBounds { index: 3, len: 3 }));
//! assert_eq!(labels.last().map(String::as_str), Some("item 2"));
//!
//! let lengths = map(["foo", "foobar"], |k: &&str| k.len());
//! assert_eq!(lengths.get("foobar"), Ok(Some(&6)));
//! assert!(!lengths.contains_key("bar"));
//! ```
//!
//! ## Cyclic definitions
//!
//! ```rust
//! use stable_value::{StableError, StableSupplier};
//!
//! static CYCLIC: StableSupplier<i32, fn() -> Result<i32, StableError>> =
//!    StableSupplier::new(|| Ok(*CYCLIC.try_get::<StableError>()? + 1));
//!
//! assert_eq!(CYCLIC.try_get::<StableError>(), Err(StableError::CyclicInitialization));
//! assert!(!CYCLIC.is_done());
//! ```

#[macro_use]
mod trace;

/// Error taxonomy.
mod error;

/// Fixed-size lazily computed list.
mod list;

/// Lazily computed map over a fixed key set.
mod map;

/// Internal slot synchronization state.
mod state;

/// Memoizing zero-argument supplier.
mod supplier;

/// The stable value cell.
mod value;

/// Read-only sequence views.
mod view;

pub use error::{Result, StableError};
pub use list::{list, StableList};
pub use map::{map, Iter as MapIter, Keys as MapKeys, StableMap, Values as MapValues};
pub use supplier::{supplier, StableSupplier};
pub use value::StableValue;
pub use view::{Reversed, SeqIter, Sequence, SubList};
