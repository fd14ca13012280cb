use stable_value::{StableError, StableSupplier};

#[derive(Debug)]
enum LoadError {
   Unavailable(&'static str),
   Stable(StableError),
}

impl From<StableError> for LoadError {
   fn from(err: StableError) -> Self {
      LoadError::Stable(err)
   }
}

fn main() {
   let attempts = std::cell::Cell::new(0);
   let data = StableSupplier::new(|| {
      attempts.set(attempts.get() + 1);
      println!("Attempting initialization (attempt {})...", attempts.get());
      if attempts.get() == 1 {
         Err(LoadError::Unavailable("backend not ready"))
      } else {
         Ok("Successfully initialized".to_string())
      }
   });

   // First attempt fails and caches nothing
   match data.try_get() {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e:?}"),
   }
   assert!(!data.is_done());

   // Second attempt succeeds
   match data.try_get::<LoadError>() {
      Ok(value) => println!("Got data: {value}"),
      Err(e) => panic!("Should have succeeded: {e:?}"),
   }
   assert!(data.is_done());

   // Subsequent calls return the cached value without running the supplier
   let value = data.try_get::<LoadError>().unwrap();
   println!("Got data again: {value}");
   assert_eq!(attempts.get(), 2);
}
