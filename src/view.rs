//! Read-only sequence views.
//!
//! [`Sequence`] is the ordered-collection contract shared by
//! [`StableList`](crate::StableList) and the views derived from it. Views
//! ([`SubList`], [`Reversed`]) own no data: every element request is
//! translated to an index of the backing sequence and resolved there, so a
//! view computes exactly the slots it touches, and only once.
//!
//! Equality, hashing and `Debug` output are defined over the realized
//! contents and therefore compute every slot not yet computed.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;

use crate::error::{realize, Result, StableError};

/// A fixed-length, read-only, lazily realized sequence.
///
/// Lookups that cannot return a `Result` (iteration, search, `Debug`)
/// panic with the error message if an element fails to resolve.
pub trait Sequence {
   /// Element type.
   type Item;

   /// Number of elements. Never changes.
   fn len(&self) -> usize;

   /// Returns the element at `index`, computing it on first access.
   ///
   /// # Errors
   ///
   /// [`StableError::IndexOutOfBounds`] if `index >= len()`, and
   /// [`StableError::CyclicInitialization`] if the element is requested from
   /// within its own computation.
   fn get(&self, index: usize) -> Result<&Self::Item>;

   /// Returns `true` if the sequence has no elements.
   #[inline]
   fn is_empty(&self) -> bool {
      self.len() == 0
   }

   /// Front-to-back iterator; elements are computed as they are visited.
   #[inline]
   fn iter(&self) -> SeqIter<'_, Self> {
      SeqIter::new(self)
   }

   /// First element, or `None` if empty.
   fn first(&self) -> Option<&Self::Item> {
      self.iter().next()
   }

   /// Last element, or `None` if empty.
   fn last(&self) -> Option<&Self::Item> {
      self.iter().next_back()
   }

   /// Index of the first element equal to `item`. Computes every element up
   /// to and including the match.
   fn index_of(&self, item: &Self::Item) -> Option<usize>
   where
      Self::Item: PartialEq,
   {
      self.iter().position(|e| e == item)
   }

   /// Index of the last element equal to `item`, searching backwards.
   fn last_index_of(&self, item: &Self::Item) -> Option<usize>
   where
      Self::Item: PartialEq,
   {
      self.iter().rposition(|e| e == item)
   }

   /// Returns `true` if some element equals `item`.
   fn contains(&self, item: &Self::Item) -> bool
   where
      Self::Item: PartialEq,
   {
      self.index_of(item).is_some()
   }

   /// Copies the fully realized contents into a `Vec`.
   fn to_vec(&self) -> Vec<Self::Item>
   where
      Self::Item: Clone,
   {
      self.iter().cloned().collect()
   }

   /// View of the elements in `from..to`.
   ///
   /// # Errors
   ///
   /// [`StableError::RangeOutOfBounds`] unless `from <= to <= len()`.
   fn sub_list(&self, from: usize, to: usize) -> Result<SubList<'_, Self>>
   where
      Self: Sized,
   {
      let len = self.len();
      if from > to || to > len {
         return Err(StableError::RangeOutOfBounds { from, to, len });
      }
      Ok(SubList {
         seq: self,
         offset: from,
         len: to - from,
      })
   }

   /// View of the elements in reverse order.
   #[inline]
   fn reversed(&self) -> Reversed<'_, Self>
   where
      Self: Sized,
   {
      Reversed { seq: self }
   }

   /// Always fails: the sequence is unmodifiable.
   fn push(&mut self, _item: Self::Item) -> Result<()> {
      Err(StableError::unsupported("push"))
   }

   /// Always fails: the sequence is unmodifiable.
   fn insert(&mut self, _index: usize, _item: Self::Item) -> Result<()> {
      Err(StableError::unsupported("insert"))
   }

   /// Always fails: the sequence is unmodifiable.
   fn set(&mut self, _index: usize, _item: Self::Item) -> Result<Self::Item> {
      Err(StableError::unsupported("set"))
   }

   /// Always fails: the sequence is unmodifiable.
   fn remove(&mut self, _index: usize) -> Result<Self::Item> {
      Err(StableError::unsupported("remove"))
   }

   /// Always fails: the sequence is unmodifiable.
   fn clear(&mut self) -> Result<()> {
      Err(StableError::unsupported("clear"))
   }
}

/// Element-wise equality of two sequences of possibly different kinds.
pub(crate) fn seq_eq<A, B>(a: &A, b: &B) -> bool
where
   A: Sequence + ?Sized,
   B: Sequence<Item = A::Item> + ?Sized,
   A::Item: PartialEq,
{
   a.len() == b.len() && a.iter().eq(b.iter())
}

pub(crate) fn seq_eq_slice<S>(seq: &S, slice: &[S::Item]) -> bool
where
   S: Sequence + ?Sized,
   S::Item: PartialEq,
{
   seq.len() == slice.len() && seq.iter().eq(slice.iter())
}

/// Hashes the realized contents like a slice of references would be hashed.
pub(crate) fn seq_hash<S, H>(seq: &S, state: &mut H)
where
   S: Sequence + ?Sized,
   S::Item: Hash,
   H: Hasher,
{
   state.write_usize(seq.len());
   for item in seq.iter() {
      item.hash(state);
   }
}

pub(crate) fn seq_debug<S>(seq: &S, f: &mut fmt::Formatter<'_>) -> fmt::Result
where
   S: Sequence + ?Sized,
   S::Item: fmt::Debug,
{
   f.debug_list().entries(seq.iter()).finish()
}

/// Implements the realized-content traits for a sequence view type.
macro_rules! impl_realized_traits {
   ($ty:ident) => {
      impl<S> PartialEq for $ty<'_, S>
      where
         S: Sequence,
         S::Item: PartialEq,
      {
         fn eq(&self, other: &Self) -> bool {
            seq_eq(self, other)
         }
      }

      impl<S> Eq for $ty<'_, S>
      where
         S: Sequence,
         S::Item: Eq,
      {
      }

      impl<S> PartialEq<[S::Item]> for $ty<'_, S>
      where
         S: Sequence,
         S::Item: PartialEq,
      {
         fn eq(&self, other: &[S::Item]) -> bool {
            seq_eq_slice(self, other)
         }
      }

      impl<S> PartialEq<Vec<S::Item>> for $ty<'_, S>
      where
         S: Sequence,
         S::Item: PartialEq,
      {
         fn eq(&self, other: &Vec<S::Item>) -> bool {
            seq_eq_slice(self, other)
         }
      }

      impl<S> Hash for $ty<'_, S>
      where
         S: Sequence,
         S::Item: Hash,
      {
         fn hash<H: Hasher>(&self, state: &mut H) {
            seq_hash(self, state)
         }
      }

      impl<S> fmt::Debug for $ty<'_, S>
      where
         S: Sequence,
         S::Item: fmt::Debug,
      {
         fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            seq_debug(self, f)
         }
      }

      impl<'a, S: Sequence> IntoIterator for &'a $ty<'_, S> {
         type Item = &'a S::Item;
         type IntoIter = SeqIter<'a, $ty<'a, S>>;

         fn into_iter(self) -> Self::IntoIter {
            SeqIter::new(self)
         }
      }
   };
}

/// Contiguous sub-range of a sequence, see [`Sequence::sub_list`].
pub struct SubList<'a, S> {
   seq: &'a S,
   offset: usize,
   len: usize,
}

impl<S: Sequence> Sequence for SubList<'_, S> {
   type Item = S::Item;

   #[inline]
   fn len(&self) -> usize {
      self.len
   }

   #[inline]
   fn get(&self, index: usize) -> Result<&S::Item> {
      if index >= self.len {
         return Err(StableError::out_of_bounds(index, self.len));
      }
      self.seq.get(self.offset + index)
   }
}

impl<S> Clone for SubList<'_, S> {
   fn clone(&self) -> Self {
      *self
   }
}

impl<S> Copy for SubList<'_, S> {}

impl_realized_traits!(SubList);

/// Reverse-order view of a sequence, see [`Sequence::reversed`].
pub struct Reversed<'a, S> {
   seq: &'a S,
}

impl<S: Sequence> Sequence for Reversed<'_, S> {
   type Item = S::Item;

   #[inline]
   fn len(&self) -> usize {
      self.seq.len()
   }

   #[inline]
   fn get(&self, index: usize) -> Result<&S::Item> {
      let len = self.seq.len();
      if index >= len {
         return Err(StableError::out_of_bounds(index, len));
      }
      self.seq.get(len - 1 - index)
   }
}

impl<S> Clone for Reversed<'_, S> {
   fn clone(&self) -> Self {
      *self
   }
}

impl<S> Copy for Reversed<'_, S> {}

impl_realized_traits!(Reversed);

/// Lazy, double-ended iterator over a [`Sequence`].
///
/// # Panics
///
/// `next`/`next_back` panic if the visited element fails to resolve
/// (e.g. a cyclic definition).
pub struct SeqIter<'a, S: ?Sized> {
   seq: &'a S,
   front: usize,
   back: usize,
}

impl<'a, S: Sequence + ?Sized> SeqIter<'a, S> {
   #[inline]
   pub(crate) fn new(seq: &'a S) -> Self {
      Self {
         seq,
         front: 0,
         back: seq.len(),
      }
   }
}

impl<'a, S: Sequence + ?Sized> Iterator for SeqIter<'a, S> {
   type Item = &'a S::Item;

   #[inline]
   fn next(&mut self) -> Option<Self::Item> {
      if self.front == self.back {
         return None;
      }
      let item = realize(self.seq.get(self.front));
      self.front += 1;
      Some(item)
   }

   #[inline]
   fn size_hint(&self) -> (usize, Option<usize>) {
      let remaining = self.back - self.front;
      (remaining, Some(remaining))
   }

   #[inline]
   fn nth(&mut self, n: usize) -> Option<Self::Item> {
      self.front = self.front.saturating_add(n).min(self.back);
      self.next()
   }
}

impl<S: Sequence + ?Sized> DoubleEndedIterator for SeqIter<'_, S> {
   #[inline]
   fn next_back(&mut self) -> Option<Self::Item> {
      if self.front == self.back {
         return None;
      }
      self.back -= 1;
      Some(realize(self.seq.get(self.back)))
   }
}

impl<S: Sequence + ?Sized> ExactSizeIterator for SeqIter<'_, S> {}

impl<S: Sequence + ?Sized> FusedIterator for SeqIter<'_, S> {}

impl<S: ?Sized> Clone for SeqIter<'_, S> {
   fn clone(&self) -> Self {
      Self {
         seq: self.seq,
         front: self.front,
         back: self.back,
      }
   }
}
