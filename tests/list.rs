use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use proptest::prelude::*;
use stable_value::{list, Sequence, StableError, StableList, StableSupplier};

fn hash_of<T: Hash>(value: &T) -> u64 {
   let mut hasher = DefaultHasher::new();
   value.hash(&mut hasher);
   hasher.finish()
}

#[test]
fn test_list_is_lazy() {
   let calls = AtomicUsize::new(0);
   let numbers = list(5, |i| {
      calls.fetch_add(1, Ordering::SeqCst);
      i * 3
   });

   assert_eq!(numbers.len(), 5);
   assert_eq!(calls.load(Ordering::SeqCst), 0);
   assert_eq!(numbers.get_if_done(2), None);

   assert_eq!(numbers.get(2), Ok(&6));
   assert_eq!(calls.load(Ordering::SeqCst), 1);
   assert_eq!(numbers.get_if_done(2), Some(&6));
   assert_eq!(numbers.get_if_done(1), None);
}

#[test]
fn test_each_index_computed_once_across_threads() {
   let size = 5;
   let counters: Arc<Vec<AtomicUsize>> = Arc::new((0..size).map(|_| AtomicUsize::new(0)).collect());
   let numbers = Arc::new(list(size, {
      let counters = Arc::clone(&counters);
      move |i| {
         counters[i].fetch_add(1, Ordering::SeqCst);
         i * 3
      }
   }));
   let start = Arc::new(Barrier::new(10));

   let threads: Vec<_> = (0..10)
      .map(|_| {
         let numbers = Arc::clone(&numbers);
         let start = Arc::clone(&start);
         thread::spawn(move || {
            start.wait();
            for i in 0..size {
               assert_eq!(numbers.get(i), Ok(&(i * 3)));
            }
         })
      })
      .collect();
   for handle in threads {
      handle.join().unwrap();
   }

   for counter in counters.iter() {
      assert_eq!(counter.load(Ordering::SeqCst), 1);
   }
   assert_eq!(numbers.get(3), Ok(&9));
}

#[test]
fn test_negative_size_is_rejected() {
   let err = StableList::try_new(-1, |i| i).unwrap_err();
   assert_eq!(err, StableError::NegativeSize { size: -1 });
   assert_eq!(err.to_string(), "size < 0: -1");

   let empty = StableList::try_new(0, |i| i).unwrap();
   assert!(empty.is_empty());
}

#[test]
fn test_index_bounds() {
   let numbers = list(5, |i| i);
   assert_eq!(numbers.get(0), Ok(&0));
   assert_eq!(numbers.get(4), Ok(&4));
   assert_eq!(numbers.get(5), Err(StableError::IndexOutOfBounds { index: 5, len: 5 }));
   assert_eq!(
      numbers.get(usize::MAX),
      Err(StableError::IndexOutOfBounds {
         index: usize::MAX,
         len: 5
      })
   );
   assert_eq!(numbers.get_if_done(7), None);
}

#[test]
#[should_panic(expected = "index 9 out of bounds for length 3")]
fn test_index_operator_panics_out_of_bounds() {
   let numbers = list(3, |i| i);
   let _value = numbers[9];
}

type CyclicList = StableList<usize, fn(usize) -> Result<usize, StableError>>;

fn cyclic_element(index: usize) -> Result<usize, StableError> {
   if index == 3 {
      CYCLIC.get()?.try_get(3).copied()
   } else {
      Ok(index)
   }
}

static CYCLIC: StableSupplier<CyclicList> = StableSupplier::new(|| {
   StableList::new_fallible(5, cyclic_element as fn(usize) -> Result<usize, StableError>)
});

#[test]
fn test_cyclic_element_is_detected() {
   let numbers = CYCLIC.get().unwrap();
   assert_eq!(numbers.try_get::<StableError>(2), Ok(&2));
   assert_eq!(numbers.try_get::<StableError>(3), Err(StableError::CyclicInitialization));
   assert_eq!(numbers.try_get::<StableError>(3), Err(StableError::CyclicInitialization));
   assert_eq!(numbers.get_if_done(3), None);
   assert_eq!(numbers.try_get::<StableError>(4), Ok(&4));
}

#[test]
fn test_fallible_element_retries() {
   let attempts = AtomicUsize::new(0);
   let numbers = StableList::new_fallible(2, |i| {
      if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
         Err(StableError::Unsupported { operation: "first attempt" })
      } else {
         Ok(i + 10)
      }
   });

   assert!(numbers.try_get::<StableError>(1).is_err());
   assert_eq!(numbers.try_get::<StableError>(1), Ok(&11));
   assert_eq!(numbers.try_get::<StableError>(7), Err(StableError::IndexOutOfBounds { index: 7, len: 2 }));
}

#[test]
fn test_to_vec_realizes_everything() {
   let numbers = list(4, |i| i * i);
   assert_eq!(numbers.to_vec(), vec![0, 1, 4, 9]);
   assert!((0..4).all(|i| numbers.get_if_done(i).is_some()));
   assert_eq!(numbers, vec![0, 1, 4, 9]);
   assert_eq!(numbers, [0, 1, 4, 9][..]);
}

#[test]
fn test_mutators_are_rejected() {
   let mut numbers = list(3, |i| i);
   assert_eq!(numbers.push(3), Err(StableError::Unsupported { operation: "push" }));
   assert_eq!(numbers.insert(0, 7), Err(StableError::Unsupported { operation: "insert" }));
   assert_eq!(numbers.set(1, 7), Err(StableError::Unsupported { operation: "set" }));
   assert_eq!(numbers.remove(0), Err(StableError::Unsupported { operation: "remove" }));
   assert_eq!(numbers.clear(), Err(StableError::Unsupported { operation: "clear" }));

   assert_eq!(numbers.len(), 3);
   assert_eq!(numbers.to_vec(), vec![0, 1, 2]);
}

#[test]
fn test_sub_list_view() {
   let calls = AtomicUsize::new(0);
   let numbers = list(6, |i| {
      calls.fetch_add(1, Ordering::SeqCst);
      i * 10
   });

   let middle = numbers.sub_list(2, 5).unwrap();
   assert_eq!(middle.len(), 3);
   assert_eq!(middle.get(0), Ok(&20));
   assert_eq!(middle.get(3), Err(StableError::IndexOutOfBounds { index: 3, len: 3 }));
   assert_eq!(calls.load(Ordering::SeqCst), 1);
   assert_eq!(numbers.get_if_done(2), Some(&20));

   assert_eq!(middle.to_vec(), vec![20, 30, 40]);
   assert_eq!(calls.load(Ordering::SeqCst), 3);

   let inner = middle.sub_list(1, 2).unwrap();
   assert_eq!(inner, vec![30]);

   assert!(numbers.sub_list(0, 0).unwrap().is_empty());
   assert_eq!(
      numbers.sub_list(4, 2).unwrap_err(),
      StableError::RangeOutOfBounds { from: 4, to: 2, len: 6 }
   );
   assert_eq!(
      numbers.sub_list(0, 7).unwrap_err(),
      StableError::RangeOutOfBounds { from: 0, to: 7, len: 6 }
   );
}

#[test]
fn test_reversed_view() {
   let numbers = list(4, |i| i + 1);
   let reversed = numbers.reversed();
   assert_eq!(reversed.get(0), Ok(&4));
   assert_eq!(reversed.to_vec(), vec![4, 3, 2, 1]);
   assert_eq!(reversed.first(), Some(&4));
   assert_eq!(reversed.last(), Some(&1));
   assert_eq!(reversed.get(4), Err(StableError::IndexOutOfBounds { index: 4, len: 4 }));
   assert_eq!(reversed.sub_list(1, 3).unwrap().to_vec(), vec![3, 2]);
}

#[test]
fn test_search() {
   let letters = list(5, |i| ["a", "b", "a", "c", "b"][i]);
   assert_eq!(letters.index_of(&"b"), Some(1));
   assert_eq!(letters.last_index_of(&"b"), Some(4));
   assert_eq!(letters.last_index_of(&"c"), Some(3));
   assert_eq!(letters.index_of(&"z"), None);
   assert!(letters.contains(&"c"));
   assert!(!letters.contains(&"z"));
   assert_eq!(letters.first(), Some(&"a"));
   assert_eq!(letters.last(), Some(&"b"));

   let empty = list(0, |i| i);
   assert_eq!(empty.first(), None);
   assert_eq!(empty.last(), None);
}

#[test]
fn test_iteration_is_lazy_and_double_ended() {
   let calls = AtomicUsize::new(0);
   let numbers = list(5, |i| {
      calls.fetch_add(1, Ordering::SeqCst);
      i
   });

   let mut iter = numbers.iter();
   assert_eq!(iter.len(), 5);
   assert_eq!(iter.next(), Some(&0));
   assert_eq!(iter.next_back(), Some(&4));
   assert_eq!(calls.load(Ordering::SeqCst), 2);
   assert_eq!(iter.nth(1), Some(&2));
   assert_eq!(iter.len(), 1);
   assert_eq!(iter.next(), Some(&3));
   assert_eq!(iter.next(), None);
   assert_eq!(iter.next_back(), None);

   let collected: Vec<_> = (&numbers).into_iter().rev().copied().collect();
   assert_eq!(collected, vec![4, 3, 2, 1, 0]);
}

#[test]
fn test_equality_hash_and_debug() {
   let a = list(3, |i| i * 2);
   let b = StableList::new(3, |i: usize| [0, 2, 4][i]);
   let c = list(3, |i| i);

   assert_eq!(a, b);
   assert_ne!(a, c);
   assert_eq!(hash_of(&a), hash_of(&b));
   assert_eq!(format!("{a:?}"), "[0, 2, 4]");
   assert_eq!(
      a.sub_list(1, 3).unwrap().to_vec(),
      b.reversed().sub_list(0, 2).unwrap().reversed().to_vec()
   );
}

#[test]
fn test_list_of_optional_values() {
   let maybe = list(3, |i| (i % 2 == 0).then_some(i));
   assert_eq!(maybe.get(1), Ok(&None));
   assert_eq!(maybe.get(2), Ok(&Some(2)));
   assert_eq!(maybe.get_if_done(1), Some(&None));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_get_async_computes_each_index_once() {
   let calls = Arc::new(AtomicUsize::new(0));
   let numbers = Arc::new(list(3, {
      let calls = Arc::clone(&calls);
      move |i| {
         calls.fetch_add(1, Ordering::SeqCst);
         i + 100
      }
   }));

   let tasks: Vec<_> = (0..12)
      .map(|n| {
         let numbers = Arc::clone(&numbers);
         tokio::spawn(async move { *numbers.get_async(n % 3).await.unwrap() })
      })
      .collect();
   for (n, task) in tasks.into_iter().enumerate() {
      assert_eq!(task.await.unwrap(), n % 3 + 100);
   }
   assert_eq!(calls.load(Ordering::SeqCst), 3);
   assert_eq!(
      numbers.get_async(3).await,
      Err(StableError::IndexOutOfBounds { index: 3, len: 3 })
   );
}

proptest! {
   #[test]
   fn test_len_matches_size(size in 0usize..512) {
      let numbers = list(size, |i| i);
      prop_assert_eq!(numbers.len(), size);
      prop_assert_eq!(numbers.iter().count(), size);
      prop_assert_eq!(numbers.is_empty(), size == 0);
   }

   #[test]
   fn test_negative_sizes_always_fail(size in isize::MIN..0) {
      let err = StableList::try_new(size, |i| i).unwrap_err();
      prop_assert_eq!(err, StableError::NegativeSize { size: size as i64 });
   }

   #[test]
   fn test_sub_list_len(len in 0usize..64, a in 0usize..64, b in 0usize..64) {
      let numbers = list(len, |i| i);
      let (from, to) = (a.min(b), a.max(b));
      match numbers.sub_list(from, to) {
         Ok(view) => {
            prop_assert!(to <= len);
            prop_assert_eq!(view.len(), to - from);
            prop_assert_eq!(view.first().copied(), (from < to).then_some(from));
         }
         Err(err) => {
            prop_assert!(to > len);
            prop_assert_eq!(err, StableError::RangeOutOfBounds { from, to, len });
         }
      }
   }
}

#[tokio::test]
async fn test_try_get_async_retries_after_error() {
   let attempts = AtomicUsize::new(0);
   let numbers = StableList::new_fallible(3, |i| {
      if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
         Err(StableError::Unsupported { operation: "first attempt" })
      } else {
         Ok(i * 2)
      }
   });

   assert!(numbers.try_get_async::<StableError>(2).await.is_err());
   assert_eq!(numbers.try_get_async::<StableError>(2).await, Ok(&4));
   assert_eq!(
      numbers.try_get_async::<StableError>(3).await,
      Err(StableError::IndexOutOfBounds { index: 3, len: 3 })
   );
}

#[test]
fn test_slow_element_does_not_hold_up_others() {
   let entered = Barrier::new(2);
   let release = Barrier::new(2);
   let numbers = list(3, |i| {
      if i == 0 {
         entered.wait();
         release.wait();
      }
      i + 10
   });

   thread::scope(|s| {
      let slow = s.spawn(|| numbers.get(0).copied());

      entered.wait();
      assert_eq!(numbers.get(1), Ok(&11));
      assert_eq!(numbers.get(2), Ok(&12));
      assert_eq!(numbers.get_if_done(0), None);
      release.wait();

      assert_eq!(slow.join().unwrap(), Ok(10));
   });
   assert_eq!(numbers.get_if_done(0), Some(&10));
}
