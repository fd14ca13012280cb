use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use stable_value::{StableSupplier, StableValue};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

struct Database {
   url: String,
}

static DATABASE: StableSupplier<Database> = StableSupplier::new(|| {
   // This closure runs only once
   COUNTER.fetch_add(1, Ordering::Relaxed);
   println!("Connecting...");
   std::thread::sleep(Duration::from_millis(50));
   Database {
      url: "postgres://localhost/app".to_string(),
   }
});

fn database() -> &'static Database {
   DATABASE.get().expect("database supplier is not cyclic")
}

fn main() {
   let threads: Vec<_> = (0..5)
      .map(|_| {
         std::thread::spawn(|| {
            println!("Thread access: {}", database().url);
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1); // Supplier ran only once

   // The low-level cell: the compute function is supplied at the call site.
   let answer: StableValue<u32> = StableValue::new();
   println!("Before: {answer:?}");
   let value = answer.get_or_init(|| 6 * 7).unwrap();
   println!("After: {answer:?} ({value})");
}
