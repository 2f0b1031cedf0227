use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use memo_once::Lazy;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn main() {
   let data = Arc::new(Lazy::new(|| {
      // This closure runs once per initialization
      COUNTER.fetch_add(1, Ordering::Relaxed);
      println!("Initializing data...");
      std::thread::sleep(std::time::Duration::from_millis(50));
      "Expensive data".to_string()
   }));

   let threads: Vec<_> = (0..5)
      .map(|_| {
         let data = Arc::clone(&data);
         std::thread::spawn(move || {
            println!("Thread access: {}", data.get());
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1);

   // Closing a resetting cell makes the next access recompute.
   data
      .try_close_with(|value| {
         println!("Releasing: {value}");
         Ok::<_, std::io::Error>(())
      })
      .unwrap();
   assert!(!data.is_initialized());

   println!("Final data: {}", data.get());
   assert_eq!(COUNTER.load(Ordering::Relaxed), 2);
}
