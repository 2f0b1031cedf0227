use std::time::{Duration, Instant};

use memo_once::AsyncLazy;

fn main() {
   let started = Instant::now();
   let model = AsyncLazy::builder(
      || {
         println!("Loading model on {:?}...", std::thread::current().name());
         std::thread::sleep(Duration::from_millis(200));
         String::from("model v1")
      },
      move || format!("still loading ({}ms)", started.elapsed().as_millis()),
   )
   .worker_name("model-loader")
   .build();

   // Every caller shares one 100ms budget, counted from the first call.
   let budget = Some(Duration::from_millis(100));
   for _ in 0..3 {
      println!("Got: {}", model.get_timeout(budget));
      std::thread::sleep(Duration::from_millis(60));
   }

   // Wait for the real value.
   println!("Got: {}", model.get());
   assert!(model.is_initialized());
}
