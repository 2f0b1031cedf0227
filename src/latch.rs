//! Single-shot completion signal for warm-up episodes.

use core::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// A gate that is released exactly once and never re-armed.
///
/// Each warm-up episode gets a fresh latch, so a waiter left over from a
/// failed episode can never be woken by a later one.
pub(crate) struct Latch {
   released: AtomicBool,
}

impl Latch {
   #[inline]
   pub(crate) const fn new() -> Self {
      Self {
         released: AtomicBool::new(false),
      }
   }

   #[inline]
   pub(crate) fn is_released(&self) -> bool {
      self.released.load(Ordering::Acquire)
   }

   /// Opens the gate and wakes every waiter. Later calls are no-ops.
   pub(crate) fn release(&self) {
      if self.released.swap(true, Ordering::Release) {
         return;
      }
      // SAFETY: The same address is used for park in `wait`.
      unsafe {
         parking_lot_core::unpark_all(self.released.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Blocks until the gate opens or `deadline` passes, whichever is first.
   /// `None` waits without bound.
   ///
   /// Wake-ups that are neither a release nor the deadline are absorbed and
   /// the wait resumes for the remaining time. Returns whether the gate is open.
   pub(crate) fn wait(&self, deadline: Option<Instant>) -> bool {
      while !self.is_released() {
         if deadline.is_some_and(|d| Instant::now() >= d) {
            return false;
         }
         // SAFETY: See `release`.
         unsafe {
            let _ = parking_lot_core::park(
               self.released.as_ptr() as usize,
               || !self.released.load(Ordering::Acquire),
               || {},
               |_, _| {},
               DEFAULT_PARK_TOKEN,
               deadline,
            );
         }
      }
      true
   }
}
