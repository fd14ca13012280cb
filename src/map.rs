//! Map over a fixed key set whose values are computed on first access.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use core::iter::FusedIterator;
use std::collections::hash_map::{self, DefaultHasher, HashMap, RandomState};

use crate::error::{realize, Result, StableError};
use crate::value::StableValue;

/// Creates a [`StableMap`] over `keys` whose values are computed by `mapper`.
///
/// Shorthand for [`StableMap::new`].
#[inline]
pub fn map<K, V, F, I>(keys: I, mapper: F) -> StableMap<K, V, F>
where
   K: Eq + Hash,
   F: Fn(&K) -> V,
   I: IntoIterator<Item = K>,
{
   StableMap::new(keys, mapper)
}

/// An unmodifiable map whose key set is fixed at construction and whose
/// values are computed lazily, once per key.
///
/// The keys are collected into the map when it is created; duplicates
/// collapse. Looking up a key outside the set is not an error, it is simply
/// absent. Each key owns an independent [`StableValue`], so computing one
/// value never holds up lookups of another.
///
/// `S` is the hasher of the key index, as for [`HashMap`].
///
/// ```
/// use stable_value::StableMap;
///
/// let lengths = StableMap::new(["a", "bb", "ccc"], |k: &&str| k.len());
/// assert_eq!(lengths.get("bb"), Ok(Some(&2)));
/// assert_eq!(lengths.get("dddd"), Ok(None));
/// assert_eq!(lengths.len(), 3);
/// ```
pub struct StableMap<K, V, F = fn(&K) -> V, S = RandomState> {
   cells: HashMap<K, StableValue<V>, S>,
   mapper: F,
}

impl<K, V, F> StableMap<K, V, F>
where
   K: Eq + Hash,
{
   /// Creates a map over `keys`, no value computed yet.
   pub fn new<I>(keys: I, mapper: F) -> Self
   where
      I: IntoIterator<Item = K>,
      F: Fn(&K) -> V,
   {
      Self::with_mapper(keys, mapper, RandomState::new())
   }

   /// Creates a map whose mapper may fail; values are read with
   /// [`try_get`](Self::try_get).
   pub fn new_fallible<I, E>(keys: I, mapper: F) -> Self
   where
      I: IntoIterator<Item = K>,
      F: Fn(&K) -> Result<V, E>,
   {
      Self::with_mapper(keys, mapper, RandomState::new())
   }
}

impl<K, V, F, S> StableMap<K, V, F, S>
where
   K: Eq + Hash,
   S: BuildHasher,
{
   /// Creates a map over `keys` whose key index uses `hasher`.
   pub fn with_hasher<I>(keys: I, mapper: F, hasher: S) -> Self
   where
      I: IntoIterator<Item = K>,
      F: Fn(&K) -> V,
   {
      Self::with_mapper(keys, mapper, hasher)
   }

   /// Fallible flavor of [`with_hasher`](Self::with_hasher).
   pub fn new_fallible_with_hasher<I, E>(keys: I, mapper: F, hasher: S) -> Self
   where
      I: IntoIterator<Item = K>,
      F: Fn(&K) -> Result<V, E>,
   {
      Self::with_mapper(keys, mapper, hasher)
   }

   fn with_mapper<I>(keys: I, mapper: F, hasher: S) -> Self
   where
      I: IntoIterator<Item = K>,
   {
      let mut cells = HashMap::with_hasher(hasher);
      cells.extend(keys.into_iter().map(|k| (k, StableValue::new())));
      Self { cells, mapper }
   }

   /// Number of keys, independent of how many values were computed.
   #[inline]
   pub fn len(&self) -> usize {
      self.cells.len()
   }

   /// Returns `true` if the key set is empty.
   #[inline]
   pub fn is_empty(&self) -> bool {
      self.cells.is_empty()
   }

   /// Membership in the key set. Never computes anything.
   #[inline]
   pub fn contains_key<Q>(&self, key: &Q) -> bool
   where
      K: Borrow<Q>,
      Q: Hash + Eq + ?Sized,
   {
      self.cells.contains_key(key)
   }

   /// Iterates the key set in unspecified order.
   #[inline]
   pub fn keys(&self) -> Keys<'_, K, V> {
      Keys {
         inner: self.cells.keys(),
      }
   }

   /// Returns the value for `key` only if it was already computed.
   #[inline]
   pub fn get_if_done<Q>(&self, key: &Q) -> Option<&V>
   where
      K: Borrow<Q>,
      Q: Hash + Eq + ?Sized,
   {
      self.cells.get(key).and_then(StableValue::get)
   }

   /// Returns the value for `key`, computing it with a fallible mapper.
   ///
   /// `Ok(None)` for keys outside the key set. A mapper error is returned
   /// as is and leaves the value uncomputed.
   pub fn try_get<Q, E>(&self, key: &Q) -> Result<Option<&V>, E>
   where
      K: Borrow<Q>,
      Q: Hash + Eq + ?Sized,
      F: Fn(&K) -> Result<V, E>,
      E: From<StableError>,
   {
      let Some((k, cell)) = self.cells.get_key_value(key) else {
         return Ok(None);
      };
      cell.get_or_try_init(|| (self.mapper)(k)).map(Some)
   }

   /// Async flavor of [`try_get`](Self::try_get).
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn try_get_async<Q, E>(&self, key: &Q) -> Result<Option<&V>, E>
   where
      K: Borrow<Q>,
      Q: Hash + Eq + ?Sized,
      F: Fn(&K) -> Result<V, E>,
      E: From<StableError>,
   {
      let Some((k, cell)) = self.cells.get_key_value(key) else {
         return Ok(None);
      };
      cell
         .get_or_try_init_async(|| async { (self.mapper)(k) })
         .await
         .map(Some)
   }

   /// Always fails: the map is unmodifiable.
   pub fn insert(&mut self, _key: K, _value: V) -> Result<Option<V>> {
      Err(StableError::unsupported("insert"))
   }

   /// Always fails: the map is unmodifiable.
   pub fn remove<Q>(&mut self, _key: &Q) -> Result<Option<V>>
   where
      K: Borrow<Q>,
      Q: Hash + Eq + ?Sized,
   {
      Err(StableError::unsupported("remove"))
   }

   /// Always fails: the map is unmodifiable.
   pub fn clear(&mut self) -> Result<()> {
      Err(StableError::unsupported("clear"))
   }
}

impl<K, V, F, S> StableMap<K, V, F, S>
where
   K: Eq + Hash,
   S: BuildHasher,
   F: Fn(&K) -> V,
{
   /// Returns the value for `key`, computing it on first access.
   ///
   /// Keys outside the key set yield `Ok(None)`.
   ///
   /// # Errors
   ///
   /// [`StableError::CyclicInitialization`] if the mapper for `key`
   /// requests `key` again.
   #[inline]
   pub fn get<Q>(&self, key: &Q) -> Result<Option<&V>>
   where
      K: Borrow<Q>,
      Q: Hash + Eq + ?Sized,
   {
      let Some((k, cell)) = self.cells.get_key_value(key) else {
         return Ok(None);
      };
      cell.get_or_init(|| (self.mapper)(k)).map(Some)
   }

   /// Async flavor of [`get`](Self::get): waits for a contended value
   /// without blocking the runtime. The mapper itself runs synchronously.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_async<Q>(&self, key: &Q) -> Result<Option<&V>>
   where
      K: Borrow<Q>,
      Q: Hash + Eq + ?Sized,
   {
      let Some((k, cell)) = self.cells.get_key_value(key) else {
         return Ok(None);
      };
      cell
         .get_or_init_async(|| async { (self.mapper)(k) })
         .await
         .map(Some)
   }

   /// Iterates the values, computing each one as it is visited.
   #[inline]
   pub fn values(&self) -> Values<'_, K, V, F> {
      Values { inner: self.iter() }
   }

   /// Iterates `(key, value)` entries, computing each value as it is visited.
   #[inline]
   pub fn iter(&self) -> Iter<'_, K, V, F> {
      Iter {
         inner: self.cells.iter(),
         mapper: &self.mapper,
      }
   }

   /// Returns `true` if some key maps to `value`. Computes values until a
   /// match is found.
   pub fn contains_value(&self, value: &V) -> bool
   where
      V: PartialEq,
   {
      self.values().any(|v| v == value)
   }

   /// Copies the fully realized contents into a `HashMap`.
   pub fn to_hash_map(&self) -> HashMap<K, V>
   where
      K: Clone,
      V: Clone,
   {
      self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
   }
}

impl<'a, K, V, F, S> IntoIterator for &'a StableMap<K, V, F, S>
where
   K: Eq + Hash,
   S: BuildHasher,
   F: Fn(&K) -> V,
{
   type Item = (&'a K, &'a V);
   type IntoIter = Iter<'a, K, V, F>;

   #[inline]
   fn into_iter(self) -> Self::IntoIter {
      self.iter()
   }
}

impl<K, V, F, G, S, T> PartialEq<StableMap<K, V, G, T>> for StableMap<K, V, F, S>
where
   K: Eq + Hash,
   V: PartialEq,
   F: Fn(&K) -> V,
   G: Fn(&K) -> V,
   S: BuildHasher,
   T: BuildHasher,
{
   fn eq(&self, other: &StableMap<K, V, G, T>) -> bool {
      self.len() == other.len()
         && self
            .iter()
            .all(|(k, v)| realize(other.get(k)).is_some_and(|w| v == w))
   }
}

impl<K, V, F, S> Eq for StableMap<K, V, F, S>
where
   K: Eq + Hash,
   V: Eq,
   F: Fn(&K) -> V,
   S: BuildHasher,
{
}

impl<K, V, F, S, T> PartialEq<HashMap<K, V, T>> for StableMap<K, V, F, S>
where
   K: Eq + Hash,
   V: PartialEq,
   F: Fn(&K) -> V,
   S: BuildHasher,
   T: BuildHasher,
{
   fn eq(&self, other: &HashMap<K, V, T>) -> bool {
      self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
   }
}

impl<K, V, F, S> Hash for StableMap<K, V, F, S>
where
   K: Eq + Hash,
   V: Hash,
   F: Fn(&K) -> V,
   S: BuildHasher,
{
   /// Hashes the realized entries independently of iteration order: each
   /// entry is hashed on its own with fixed keys and the results are summed,
   /// so maps that compare equal hash equal.
   fn hash<H: Hasher>(&self, state: &mut H) {
      let entries = self.iter().fold(0u64, |acc, (k, v)| {
         let mut entry = DefaultHasher::new();
         k.hash(&mut entry);
         v.hash(&mut entry);
         acc.wrapping_add(entry.finish())
      });
      state.write_usize(self.len());
      state.write_u64(entries);
   }
}

impl<K, V, F, S> fmt::Debug for StableMap<K, V, F, S>
where
   K: Eq + Hash + fmt::Debug,
   V: fmt::Debug,
   F: Fn(&K) -> V,
   S: BuildHasher,
{
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_map().entries(self.iter()).finish()
   }
}

/// Iterator over the key set of a [`StableMap`].
pub struct Keys<'a, K, V> {
   inner: hash_map::Keys<'a, K, StableValue<V>>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
   type Item = &'a K;

   #[inline]
   fn next(&mut self) -> Option<&'a K> {
      self.inner.next()
   }

   #[inline]
   fn size_hint(&self) -> (usize, Option<usize>) {
      self.inner.size_hint()
   }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Lazy entry iterator of a [`StableMap`].
///
/// # Panics
///
/// `next` panics if the visited value fails to resolve.
pub struct Iter<'a, K, V, F> {
   inner: hash_map::Iter<'a, K, StableValue<V>>,
   mapper: &'a F,
}

impl<'a, K, V, F> Iterator for Iter<'a, K, V, F>
where
   F: Fn(&K) -> V,
{
   type Item = (&'a K, &'a V);

   fn next(&mut self) -> Option<Self::Item> {
      let (k, cell) = self.inner.next()?;
      let mapper = self.mapper;
      Some((k, realize(cell.get_or_init(|| mapper(k)))))
   }

   #[inline]
   fn size_hint(&self) -> (usize, Option<usize>) {
      self.inner.size_hint()
   }
}

impl<K, V, F: Fn(&K) -> V> ExactSizeIterator for Iter<'_, K, V, F> {}
impl<K, V, F: Fn(&K) -> V> FusedIterator for Iter<'_, K, V, F> {}

/// Lazy value iterator of a [`StableMap`].
///
/// # Panics
///
/// `next` panics if the visited value fails to resolve.
pub struct Values<'a, K, V, F> {
   inner: Iter<'a, K, V, F>,
}

impl<'a, K, V, F> Iterator for Values<'a, K, V, F>
where
   F: Fn(&K) -> V,
{
   type Item = &'a V;

   #[inline]
   fn next(&mut self) -> Option<&'a V> {
      self.inner.next().map(|(_, v)| v)
   }

   #[inline]
   fn size_hint(&self) -> (usize, Option<usize>) {
      self.inner.size_hint()
   }
}

impl<K, V, F: Fn(&K) -> V> ExactSizeIterator for Values<'_, K, V, F> {}
impl<K, V, F: Fn(&K) -> V> FusedIterator for Values<'_, K, V, F> {}
