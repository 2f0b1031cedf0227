use std::sync::atomic::{AtomicBool, Ordering};

use memo_once::{lazy_ex, TryLazy};

static FAIL: AtomicBool = AtomicBool::new(true);

fn main() {
   let data: TryLazy<String, &'static str> = lazy_ex(|| {
      let fail = FAIL.load(Ordering::Relaxed);
      println!("Attempting initialization (fail={fail})...");
      if fail {
         Err("Initialization failed!")
      } else {
         Ok("Successfully initialized".to_string())
      }
   });

   // First attempt fails
   match data.get() {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e}"),
   }
   assert!(!data.is_initialized());

   // Second attempt succeeds
   FAIL.store(false, Ordering::Relaxed);
   match data.get() {
      Ok(value) => println!("Got data: {value}"),
      Err(_) => panic!("Should have succeeded"),
   }
   assert!(data.is_initialized());

   // Later failures of the provider no longer matter, the value is cached
   FAIL.store(true, Ordering::Relaxed);
   assert_eq!(data.map(|s| s.len()), Some(24));
}
