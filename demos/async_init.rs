use std::sync::atomic::{AtomicUsize, Ordering};

use stable_value::{StableList, StableValue};
use tokio::time::{sleep, Duration};

static COUNTER: AtomicUsize = AtomicUsize::new(0);
static ASYNC_DATA: StableValue<String> = StableValue::new();

async fn get_async_data() -> &'static String {
   ASYNC_DATA
      .get_or_init_async(|| async {
         // This async block runs only once
         COUNTER.fetch_add(1, Ordering::Relaxed);
         println!("Initializing async data...");
         sleep(Duration::from_millis(50)).await;
         "Async expensive data".to_string()
      })
      .await
      .expect("not cyclic")
}

#[tokio::main]
async fn main() {
   let tasks: Vec<_> = (0..5)
      .map(|_| {
         tokio::spawn(async {
            println!("Task access: {}", get_async_data().await);
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1); // Initializer ran only once

   let pages = StableList::new(3, |i| format!("page {i}"));
   for i in 0..pages.len() {
      println!("{}", pages.get_async(i).await.unwrap());
   }
}
