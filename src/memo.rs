//! Double-checked memoization core shared by [`Lazy`](crate::Lazy) and
//! [`TryLazy`](crate::TryLazy).
//!
//! `Memo<T>` owns the cached slot and the packed [`CellState`]. Reads of an
//! initialized cell take a read pin and clone the cached `Arc` without locking.
//! Everything else (first computation, inspection, close and reset) runs under
//! the cell's lock, so at most one provider call is ever in flight. Pins stay
//! available while the lock is held; only a reset shuts them out.

use core::cell::UnsafeCell;
use core::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::trace;

use crate::state::{CellState, StateGuard};

pub(crate) struct Memo<T> {
   value: UnsafeCell<Option<Arc<T>>>,
   state: CellState,
   reset_after_close: bool,
}

impl<T> Memo<T> {
   #[inline]
   pub(crate) const fn new(reset_after_close: bool) -> Self {
      Self {
         value: UnsafeCell::new(None),
         state: CellState::new(),
         reset_after_close,
      }
   }

   #[inline]
   pub(crate) fn reset_after_close(&self) -> bool {
      self.reset_after_close
   }

   /// Point-in-time snapshot of the DONE flag. Never blocks.
   #[inline]
   pub(crate) fn is_initialized(&self) -> bool {
      self.state.is_done(Ordering::Acquire)
   }

   /// Returns the cached value without blocking, if one can be read right now.
   ///
   /// `None` also covers a cell that is being closed by another thread.
   #[inline]
   pub(crate) fn peek(&self) -> Option<Arc<T>> {
      let _pin = self.state.pin()?;
      // SAFETY: The slot is only cleared after every pin has dropped.
      unsafe { (*self.value.get()).clone() }
   }

   /// Returns the cached value, computing it with `f` on the first call.
   ///
   /// On `Err` (or a panic in `f`) the cell stays empty and the next call retries.
   #[inline]
   pub(crate) fn get_or_try_init<F, E>(&self, f: F) -> Result<Arc<T>, E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.peek() {
         return Ok(value);
      }
      self.initialize(f)
   }

   #[cold]
   fn initialize<F, E>(&self, f: F) -> Result<Arc<T>, E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      let guard = self.state.lock();
      if let Some(value) = self.slot(&guard) {
         // Someone else finished while we waited for the lock.
         return Ok(Arc::clone(value));
      }
      trace!("computing memoized value");
      let value = Arc::new(f()?);
      // SAFETY: We hold the lock, and pins are refused until DONE is published.
      unsafe { *self.value.get() = Some(Arc::clone(&value)) };
      guard.commit();
      Ok(value)
   }

   /// Runs `action` on the cached value, if any.
   ///
   /// Other threads, and `action` itself, can still `get` the cached value.
   pub(crate) fn if_present<F, E>(&self, action: F) -> Result<(), E>
   where
      F: FnOnce(&T) -> Result<(), E>,
   {
      let guard = self.state.lock();
      match self.slot(&guard) {
         Some(value) => action(value),
         None => Ok(()),
      }
   }

   /// Applies `f` to the cached value, if any.
   pub(crate) fn map<U, F>(&self, f: F) -> Option<U>
   where
      F: FnOnce(&T) -> Option<U>,
   {
      let guard = self.state.lock();
      self.slot(&guard).and_then(|value| f(value))
   }

   /// Hands the cached value to `close`, then empties the cell if it was built
   /// with reset-after-close. An `Err` from `close` leaves the cell untouched.
   pub(crate) fn try_close<F, E>(&self, close: F) -> Result<(), E>
   where
      F: FnOnce(&T) -> Result<(), E>,
   {
      let mut guard = self.state.lock();
      let Some(value) = self.slot(&guard) else {
         return Ok(());
      };
      close(value)?;
      if !self.reset_after_close {
         return Ok(());
      }
      guard.exclude_readers();
      // SAFETY: We hold the lock and no pin is live.
      let released = unsafe { (*self.value.get()).take() };
      guard.reset();
      trace!("memoized value reset after close");
      // Our handle goes away outside the lock; callers may still hold theirs.
      drop(released);
      Ok(())
   }

   /// Borrows the slot for as long as the lock is held.
   #[inline(always)]
   fn slot<'a>(&'a self, guard: &'a StateGuard<'_>) -> Option<&'a Arc<T>> {
      debug_assert_eq!(guard.is_done(), unsafe { (*self.value.get()).is_some() });
      // SAFETY: Only a lock holder writes the slot, and the guard proves we are it.
      unsafe { (*self.value.get()).as_ref() }
   }
}

// SAFETY:
// Values leave the cell as `Arc<T>` clones that may be used and dropped on any
// thread, so sharing the cell requires `T: Send + Sync`. The slot itself is
// only written under the lock, either while the cell is not DONE or after every
// pin has drained, and only read under a pin or the lock.
unsafe impl<T: Send + Sync> Sync for Memo<T> {}
