#![cfg(feature = "async-tokio-mt")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use memo_once::{AsyncLazy, Lazy};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lazy_get_async_from_many_tasks() {
   let counter = Arc::new(AtomicUsize::new(0));
   let cell = {
      let counter = Arc::clone(&counter);
      Arc::new(Lazy::new(move || {
         counter.fetch_add(1, Ordering::SeqCst);
         std::thread::sleep(Duration::from_millis(20));
         String::from("shared")
      }))
   };

   let tasks: Vec<_> = (0..8)
      .map(|_| {
         let cell = Arc::clone(&cell);
         tokio::spawn(async move { cell.get_async().await })
      })
      .collect();

   let mut values = Vec::new();
   for task in tasks {
      values.push(task.await.unwrap());
   }
   assert_eq!(counter.load(Ordering::SeqCst), 1);
   assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_lazy_get_timeout_async() {
   let cell = AsyncLazy::new(
      || {
         std::thread::sleep(Duration::from_millis(150));
         "done"
      },
      || "waiting",
   );

   assert_eq!(
      cell.get_timeout_async(Some(Duration::from_millis(10))).await,
      "waiting"
   );
   assert_eq!(cell.get_timeout_async(None).await, "done");
}
