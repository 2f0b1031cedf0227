use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use memo_once::TryLazy;

#[derive(Debug, PartialEq, Eq)]
struct LoadError(&'static str);

impl fmt::Display for LoadError {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.0)
   }
}

impl std::error::Error for LoadError {}

/// Fails on the first `failures` calls, then yields the attempt number.
fn flaky(attempts: &Arc<AtomicUsize>, failures: usize) -> TryLazy<usize, LoadError> {
   let attempts = Arc::clone(attempts);
   TryLazy::new(move || {
      let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
      if attempt <= failures {
         Err(LoadError("not yet"))
      } else {
         Ok(attempt)
      }
   })
}

#[test]
fn test_get_ok_is_cached() {
   let attempts = Arc::new(AtomicUsize::new(0));
   let cell = flaky(&attempts, 0);

   let first = cell.get().unwrap();
   let second = cell.get().unwrap();
   assert!(Arc::ptr_eq(&first, &second));
   assert_eq!(*first, 1);
   assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failure_is_not_cached() {
   let attempts = Arc::new(AtomicUsize::new(0));
   let cell = flaky(&attempts, 2);

   assert_eq!(cell.get(), Err(LoadError("not yet")));
   assert!(!cell.is_initialized());
   assert_eq!(cell.get(), Err(LoadError("not yet")));
   assert!(!cell.is_initialized());

   assert_eq!(*cell.get().unwrap(), 3);
   assert!(cell.is_initialized());
   assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn test_error_propagates_with_question_mark() {
   fn load(cell: &TryLazy<usize, LoadError>) -> Result<usize, Box<dyn std::error::Error>> {
      Ok(*cell.get()?)
   }

   let attempts = Arc::new(AtomicUsize::new(0));
   let cell = flaky(&attempts, 1);
   assert_eq!(load(&cell).unwrap_err().to_string(), "not yet");
   assert_eq!(load(&cell).unwrap(), 2);
}

#[test]
fn test_concurrent_get_runs_provider_once() {
   const THREADS: usize = 12;
   let attempts = Arc::new(AtomicUsize::new(0));
   let cell = Arc::new(flaky(&attempts, 0));
   let barrier = Arc::new(Barrier::new(THREADS));

   let handles: Vec<_> = (0..THREADS)
      .map(|_| {
         let cell = Arc::clone(&cell);
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            cell.get().unwrap()
         })
      })
      .collect();

   let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
   assert_eq!(attempts.load(Ordering::SeqCst), 1);
   assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
}

#[test]
fn test_close_and_reset() {
   let attempts = Arc::new(AtomicUsize::new(0));
   let cell = flaky(&attempts, 0);
   cell.get().unwrap();

   let mut closed = None;
   cell
      .try_close_with(|v| {
         closed = Some(*v);
         Ok::<_, LoadError>(())
      })
      .unwrap();
   assert_eq!(closed, Some(1));
   assert!(!cell.is_initialized());
   assert_eq!(*cell.get().unwrap(), 2);
}

#[test]
fn test_sticky_close() {
   let attempts = Arc::new(AtomicUsize::new(0));
   let cell = {
      let attempts = Arc::clone(&attempts);
      TryLazy::sticky(move || Ok::<_, LoadError>(attempts.fetch_add(1, Ordering::SeqCst)))
   };
   cell.get().unwrap();
   cell.try_close();
   assert!(cell.is_initialized());
   assert_eq!(*cell.get().unwrap(), 0);
   assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_map_and_if_present() {
   let attempts = Arc::new(AtomicUsize::new(0));
   let cell = flaky(&attempts, 0);

   assert_eq!(cell.map(|v| v + 1), None);
   assert_eq!(attempts.load(Ordering::SeqCst), 0);

   cell.get().unwrap();
   assert_eq!(cell.map(|v| v + 1), Some(2));
   assert_eq!(
      cell.if_present(|_| Err(LoadError("consumer"))),
      Err(LoadError("consumer"))
   );
   assert!(cell.is_initialized());
}

#[test]
fn test_formatting_never_runs_provider() {
   let attempts = Arc::new(AtomicUsize::new(0));
   let cell = flaky(&attempts, usize::MAX);

   assert_eq!(format!("{cell}"), "<uninit>");
   assert_eq!(format!("{cell:?}"), "TryLazy(<uninit>)");
   assert_eq!(attempts.load(Ordering::SeqCst), 0);

   let ok = flaky(&attempts, 0);
   ok.get().unwrap();
   assert_eq!(format!("{ok}"), "1");
}
