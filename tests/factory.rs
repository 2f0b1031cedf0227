use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use memo_once::{async_lazy, lazy, lazy_ex, lazy_ex_with, lazy_with, Lazy, TryLazy};

#[test]
fn test_lazy_defaults_to_reset_after_close() {
   let cell = lazy(|| 1);
   assert!(cell.resets_after_close());
   assert!(!lazy_with(|| 1, false).resets_after_close());
}

#[test]
fn test_rewrap_lazy_returns_same_cell() {
   let counter = Arc::new(AtomicUsize::new(0));
   let cell: Lazy<usize> = {
      let counter = Arc::clone(&counter);
      lazy_with(move || counter.fetch_add(1, Ordering::SeqCst), false)
   };
   let value = cell.get();

   // Passing a cell back in neither wraps it again nor changes its settings.
   let rewrapped = lazy_with(cell, true);
   assert!(rewrapped.is_initialized());
   assert!(!rewrapped.resets_after_close());
   assert!(Arc::ptr_eq(&value, &rewrapped.get()));
   assert_eq!(counter.load(Ordering::SeqCst), 1);

   let again = lazy(rewrapped);
   assert!(Arc::ptr_eq(&value, &again.get()));
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rewrap_try_lazy_returns_same_cell() {
   let counter = Arc::new(AtomicUsize::new(0));
   let cell: TryLazy<usize, String> = {
      let counter = Arc::clone(&counter);
      lazy_ex(move || Ok(counter.fetch_add(1, Ordering::SeqCst)))
   };
   let value = cell.get().unwrap();

   let rewrapped = lazy_ex_with(cell, false);
   assert!(rewrapped.resets_after_close());
   assert!(Arc::ptr_eq(&value, &rewrapped.get().unwrap()));
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_lazy_ex_propagates_failure() {
   let cell: TryLazy<u8, String> = lazy_ex(|| "300".parse::<u8>().map_err(|e| e.to_string()));
   assert!(cell.get().is_err());
   assert!(!cell.is_initialized());
}

#[test]
fn test_async_lazy_factory() {
   let cell = async_lazy(
      || {
         std::thread::sleep(Duration::from_millis(100));
         std::thread::current().name().map(str::to_owned)
      },
      || Some(String::from("pending")),
      Some("factory-worker"),
   );
   assert_eq!(
      cell.get_timeout(Some(Duration::from_millis(1))).as_deref(),
      Some("pending")
   );
   assert_eq!(cell.get().as_deref(), Some("factory-worker"));

   let unnamed = async_lazy(|| 3, || 0, None);
   assert_eq!(unnamed.get(), 3);
}
