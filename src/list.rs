//! Fixed-size list whose elements are computed on first access.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::Index;

use crate::error::{realize, Result, StableError};
use crate::value::StableValue;
use crate::view::{self, SeqIter, Sequence};

/// Creates a [`StableList`] of `len` elements computed by `mapper`.
///
/// Shorthand for [`StableList::new`].
#[inline]
pub fn list<T, F>(len: usize, mapper: F) -> StableList<T, F>
where
   F: Fn(usize) -> T,
{
   StableList::new(len, mapper)
}

/// An unmodifiable list of `len` lazily computed elements.
///
/// Element `i` is `mapper(i)`, computed the first time it is requested and
/// cached forever after. Every index is an independent [`StableValue`]:
/// threads requesting different indices never wait for each other, threads
/// requesting the same uncomputed index run `mapper` once between them.
///
/// The full read-only contract (search, sub-ranges, reversal, equality) is
/// provided by the [`Sequence`] trait.
///
/// ```
/// use stable_value::{Sequence, StableList};
///
/// let squares = StableList::new(4, |i| i * i);
/// assert_eq!(squares.get(3), Ok(&9));
/// assert_eq!(squares.reversed().to_vec(), vec![9, 4, 1, 0]);
/// ```
pub struct StableList<T, F = fn(usize) -> T> {
   cells: Box<[StableValue<T>]>,
   mapper: F,
}

impl<T, F> StableList<T, F> {
   /// Creates a list of `len` elements, none of them computed yet.
   pub fn new(len: usize, mapper: F) -> Self
   where
      F: Fn(usize) -> T,
   {
      Self::with_mapper(len, mapper)
   }

   /// Creates a list from a signed length, as produced by arithmetic on
   /// signed sizes.
   ///
   /// # Errors
   ///
   /// [`StableError::NegativeSize`] if `len < 0`.
   pub fn try_new(len: isize, mapper: F) -> Result<Self>
   where
      F: Fn(usize) -> T,
   {
      let len = usize::try_from(len).map_err(|_| StableError::NegativeSize { size: len as i64 })?;
      Ok(Self::with_mapper(len, mapper))
   }

   /// Creates a list whose mapper may fail; elements are read with
   /// [`try_get`](Self::try_get).
   pub fn new_fallible<E>(len: usize, mapper: F) -> Self
   where
      F: Fn(usize) -> Result<T, E>,
   {
      Self::with_mapper(len, mapper)
   }

   fn with_mapper(len: usize, mapper: F) -> Self {
      Self {
         cells: (0..len).map(|_| StableValue::new()).collect(),
         mapper,
      }
   }

   /// Number of elements, computed or not.
   #[inline]
   pub fn len(&self) -> usize {
      self.cells.len()
   }

   /// Returns `true` if the list has no elements.
   #[inline]
   pub fn is_empty(&self) -> bool {
      self.cells.is_empty()
   }

   /// Returns the element at `index` only if it was already computed.
   ///
   /// Never blocks and never computes.
   #[inline]
   pub fn get_if_done(&self, index: usize) -> Option<&T> {
      self.cells.get(index).and_then(StableValue::get)
   }

   #[inline]
   fn cell(&self, index: usize) -> Result<&StableValue<T>> {
      self
         .cells
         .get(index)
         .ok_or_else(|| StableError::out_of_bounds(index, self.cells.len()))
   }

   /// Returns the element at `index`, computing it with a fallible mapper.
   ///
   /// A mapper error is returned as is and leaves the element uncomputed;
   /// the next request retries.
   pub fn try_get<E>(&self, index: usize) -> Result<&T, E>
   where
      F: Fn(usize) -> Result<T, E>,
      E: From<StableError>,
   {
      self.cell(index)?.get_or_try_init(|| (self.mapper)(index))
   }

   /// Async flavor of [`try_get`](Self::try_get).
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn try_get_async<E>(&self, index: usize) -> Result<&T, E>
   where
      F: Fn(usize) -> Result<T, E>,
      E: From<StableError>,
   {
      self
         .cell(index)?
         .get_or_try_init_async(|| async { (self.mapper)(index) })
         .await
   }
}

impl<T, F> StableList<T, F>
where
   F: Fn(usize) -> T,
{
   /// Returns the element at `index`, computing it on first access.
   ///
   /// # Errors
   ///
   /// [`StableError::IndexOutOfBounds`] if `index >= len()`;
   /// [`StableError::CyclicInitialization`] if the mapper for `index`
   /// requests `index` again.
   #[inline]
   pub fn get(&self, index: usize) -> Result<&T> {
      self.cell(index)?.get_or_init(|| (self.mapper)(index))
   }

   /// Async flavor of [`get`](Self::get): waits for a contended element
   /// without blocking the runtime. The mapper itself runs synchronously.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_async(&self, index: usize) -> Result<&T> {
      self
         .cell(index)?
         .get_or_init_async(|| async { (self.mapper)(index) })
         .await
   }

   /// Front-to-back iterator; elements are computed as they are visited.
   #[inline]
   pub fn iter(&self) -> SeqIter<'_, Self> {
      SeqIter::new(self)
   }
}

impl<T, F> Sequence for StableList<T, F>
where
   F: Fn(usize) -> T,
{
   type Item = T;

   #[inline]
   fn len(&self) -> usize {
      self.cells.len()
   }

   #[inline]
   fn get(&self, index: usize) -> Result<&T> {
      StableList::get(self, index)
   }
}

impl<T, F> Index<usize> for StableList<T, F>
where
   F: Fn(usize) -> T,
{
   type Output = T;

   /// # Panics
   ///
   /// If `index` is out of bounds or the element is cyclic.
   #[track_caller]
   fn index(&self, index: usize) -> &T {
      realize(self.get(index))
   }
}

impl<'a, T, F> IntoIterator for &'a StableList<T, F>
where
   F: Fn(usize) -> T,
{
   type Item = &'a T;
   type IntoIter = SeqIter<'a, StableList<T, F>>;

   #[inline]
   fn into_iter(self) -> Self::IntoIter {
      self.iter()
   }
}

impl<T, F, G> PartialEq<StableList<T, G>> for StableList<T, F>
where
   T: PartialEq,
   F: Fn(usize) -> T,
   G: Fn(usize) -> T,
{
   fn eq(&self, other: &StableList<T, G>) -> bool {
      view::seq_eq(self, other)
   }
}

impl<T: Eq, F: Fn(usize) -> T> Eq for StableList<T, F> {}

impl<T: PartialEq, F: Fn(usize) -> T> PartialEq<[T]> for StableList<T, F> {
   fn eq(&self, other: &[T]) -> bool {
      view::seq_eq_slice(self, other)
   }
}

impl<T: PartialEq, F: Fn(usize) -> T> PartialEq<Vec<T>> for StableList<T, F> {
   fn eq(&self, other: &Vec<T>) -> bool {
      view::seq_eq_slice(self, other)
   }
}

impl<T: Hash, F: Fn(usize) -> T> Hash for StableList<T, F> {
   fn hash<H: Hasher>(&self, state: &mut H) {
      view::seq_hash(self, state)
   }
}

impl<T: fmt::Debug, F: Fn(usize) -> T> fmt::Debug for StableList<T, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      view::seq_debug(self, f)
   }
}
