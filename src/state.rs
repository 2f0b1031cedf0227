//! Internal synchronization state for the memoized cells.
//!
//! The state is packed into a single `AtomicUsize` with the following layout:
//! - Bit 0: DONE - a value is cached
//! - Bit 1: LOCKED - one thread holds the cell's lock
//! - Bit 2: WAITING - at least one thread is parked on the state
//! - Bit 3: WRITING - the lock holder is about to clear the slot; no new pins
//! - Bits 4-7: EPOCH - generation counter, bumped on every unlock
//! - Bits 8..: READERS - number of live read pins
//!
//! Readers take a pin with a single CAS and never park while the cell is
//! DONE and not WRITING. LOCKED only keeps other lockers out, so inspecting
//! the cached value under the lock does not disturb readers. A lock holder
//! that needs to clear the slot calls [`StateGuard::exclude_readers`], which
//! sets WRITING and waits for the remaining pins to drain.

use core::sync::atomic::{AtomicUsize, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Packed atomic state shared by `Lazy` and `TryLazy`.
#[repr(transparent)]
pub(crate) struct CellState(AtomicUsize);

impl CellState {
   /// Bit flag: a value is cached.
   const DONE: usize = 1;
   /// Bit flag: the lock is held.
   const LOCKED: usize = 2;
   /// Bit flag: at least one thread is parked.
   const WAITING: usize = 4;
   /// Bit flag: new read pins are refused.
   const WRITING: usize = 8;
   /// Start of epoch bits.
   const EPOCH_1: usize = 0x10;
   /// Mask for epoch bits.
   const EPOCH_MASK: usize = 0xF0;
   /// One read pin.
   const READER: usize = 0x100;
   /// Mask for the reader count.
   const READERS_MASK: usize = !0xFF;

   #[inline(always)]
   const fn next_epoch(current_state: usize) -> usize {
      (current_state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates a new state representing an empty cell.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicUsize::new(0))
   }

   #[inline]
   fn notify_all(&self) {
      // SAFETY: The same address is used for every park and unpark on this state.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks until the state differs from `expected_state`.
   #[inline]
   fn wait(&self, expected_state: usize) {
      // SAFETY: See `notify_all`.
      unsafe {
         // Spurious wake-ups are fine, every caller re-checks in a loop.
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(Ordering::Acquire) == expected_state,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Sets WAITING if needed and parks on the observed state.
   /// Returns without parking if the state moved in the meantime.
   #[inline]
   fn wait_on(&self, observed: usize) {
      if observed & Self::WAITING != 0 {
         self.wait(observed);
         return;
      }
      let waiting = observed | Self::WAITING;
      if self
         .0
         .compare_exchange_weak(observed, waiting, Ordering::Relaxed, Ordering::Relaxed)
         .is_ok()
      {
         self.wait(waiting);
      }
   }

   /// Checks if the DONE flag is set.
   #[inline]
   pub(crate) fn is_done(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::DONE != 0
   }

   /// Takes a read pin if the cell is DONE and its slot is not being cleared.
   ///
   /// A held lock does not matter: lock holders only write the slot of an
   /// empty cell, or after [`StateGuard::exclude_readers`].
   /// Returns `None` when the caller has to fall back to the lock.
   #[inline]
   pub(crate) fn pin(&self) -> Option<ReadPin<'_>> {
      let mut current_state = self.0.load(Ordering::Relaxed);
      loop {
         if current_state & (Self::DONE | Self::WRITING) != Self::DONE {
            return None;
         }
         // Acquire pairs with the Release in `StateGuard::drop`, publishing the slot.
         match self.0.compare_exchange_weak(
            current_state,
            current_state + Self::READER,
            Ordering::Acquire,
            Ordering::Relaxed,
         ) {
            Ok(_) => return Some(ReadPin { state: self }),
            Err(actual) => current_state = actual,
         }
      }
   }

   fn unpin(&self) {
      let mut current_state = self.0.load(Ordering::Relaxed);
      loop {
         let mut new_state = current_state - Self::READER;
         let last = new_state & Self::READERS_MASK == 0;
         if last {
            // Whoever clears WAITING must wake everyone parked on the state.
            new_state &= !Self::WAITING;
         }
         match self.0.compare_exchange_weak(
            current_state,
            new_state,
            Ordering::Release,
            Ordering::Relaxed,
         ) {
            Ok(_) => {
               if last && current_state & Self::WAITING != 0 {
                  self.notify_all();
               }
               return;
            }
            Err(actual) => current_state = actual,
         }
      }
   }

   /// Acquires the cell's lock, blocking while another thread holds it.
   ///
   /// Unlike a plain once-lock this succeeds whether or not the cell is DONE,
   /// so inspection and reset can run under it too. Readers keep pinning a
   /// DONE cell while the lock is held.
   pub(crate) fn lock(&self) -> StateGuard<'_> {
      loop {
         let current_state = self.0.load(Ordering::Relaxed);
         if current_state & Self::LOCKED == 0 {
            if self
               .0
               .compare_exchange_weak(
                  current_state,
                  current_state | Self::LOCKED,
                  Ordering::Acquire,
                  Ordering::Relaxed,
               )
               .is_ok()
            {
               return StateGuard {
                  state: self,
                  done: current_state & Self::DONE != 0,
               };
            }
            std::hint::spin_loop();
            continue;
         }
         self.wait_on(current_state);
      }
   }
}

/// Keeps the cached slot alive for a lock-free reader.
pub(crate) struct ReadPin<'a> {
   state: &'a CellState,
}

impl Drop for ReadPin<'_> {
   #[inline]
   fn drop(&mut self) {
      self.state.unpin();
   }
}

/// RAII guard for the cell's lock.
///
/// Dropping the guard unlocks the cell and keeps the DONE flag as it was when
/// the lock was taken, so a provider that panics or fails leaves an empty cell
/// empty. `commit` and `reset` change the flag on the way out.
pub(crate) struct StateGuard<'a> {
   state: &'a CellState,
   done: bool,
}

impl StateGuard<'_> {
   /// Whether the cell holds a value.
   #[inline(always)]
   pub(crate) fn is_done(&self) -> bool {
      self.done
   }

   /// Refuses new read pins and waits for the live ones to drop.
   ///
   /// Required before the slot of a DONE cell is cleared. Calling `get` on
   /// the same cell from this thread afterwards, while the guard lives, deadlocks.
   pub(crate) fn exclude_readers(&mut self) {
      let state = &self.state.0;
      state.fetch_or(CellState::WRITING, Ordering::Relaxed);
      loop {
         // Acquire pairs with the Release in `unpin`: readers are done with the slot.
         let current_state = state.load(Ordering::Acquire);
         if current_state & CellState::READERS_MASK == 0 {
            return;
         }
         self.state.wait_on(current_state);
      }
   }

   /// Marks the cell as DONE and unlocks it.
   #[inline(always)]
   pub(crate) fn commit(mut self) {
      self.done = true;
   }

   /// Clears DONE and unlocks the cell.
   #[inline(always)]
   pub(crate) fn reset(mut self) {
      self.done = false;
   }
}

impl Drop for StateGuard<'_> {
   #[inline]
   fn drop(&mut self) {
      let state = &self.state.0;
      let done = if self.done { CellState::DONE } else { 0 };
      // Readers may come and go while we hold the lock, so keep their count.
      let mut current_state = state.load(Ordering::Relaxed);
      loop {
         let new_state = (current_state & CellState::READERS_MASK)
            | done
            | CellState::next_epoch(current_state);
         // Release publishes writes to the slot to the next pin or lock.
         match state.compare_exchange_weak(
            current_state,
            new_state,
            Ordering::Release,
            Ordering::Relaxed,
         ) {
            Ok(_) => {
               if current_state & CellState::WAITING != 0 {
                  self.state.notify_all();
               }
               return;
            }
            Err(actual) => current_state = actual,
         }
      }
   }
}
