//! Memoized value with an infallible provider.
//!
//! [`Lazy<T>`] defers a computation until the first [`get`](Lazy::get), caches
//! the result and hands out the same `Arc<T>` to every caller. The cached value
//! can be inspected, closed and (optionally) reset so the next `get` computes a
//! fresh one.

use core::convert::Infallible;
use core::fmt;
use std::sync::Arc;

use crate::memo::Memo;

type Provider<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// A thread-safe, resettable memoized value.
///
/// The provider runs at most once per initialization, no matter how many
/// threads call [`get`](Self::get) concurrently. A panic in the provider
/// propagates to the caller that triggered it and leaves the cell empty, so a
/// later `get` retries.
///
/// Calling `get` on the same cell from inside its own provider deadlocks.
///
/// # Examples
///
/// ```rust
/// use memo_once::Lazy;
///
/// let config = Lazy::new(|| "production".to_string());
/// assert!(!config.is_initialized());
/// assert_eq!(*config.get(), "production");
///
/// config.try_close();
/// assert!(!config.is_initialized());
/// ```
pub struct Lazy<T> {
   memo: Memo<T>,
   provider: Provider<T>,
}

impl<T> Lazy<T> {
   /// Creates an empty cell that resets after [`try_close`](Self::try_close).
   #[inline]
   #[must_use]
   pub fn new<F>(provider: F) -> Self
   where
      F: Fn() -> T + Send + Sync + 'static,
   {
      Self::with_reset(provider, true)
   }

   /// Creates an empty cell that keeps its value across
   /// [`try_close`](Self::try_close), making it single-shot.
   #[inline]
   #[must_use]
   pub fn sticky<F>(provider: F) -> Self
   where
      F: Fn() -> T + Send + Sync + 'static,
   {
      Self::with_reset(provider, false)
   }

   /// Creates an empty cell with an explicit reset-after-close behavior.
   #[inline]
   #[must_use]
   pub fn with_reset<F>(provider: F, reset_after_close: bool) -> Self
   where
      F: Fn() -> T + Send + Sync + 'static,
   {
      Self {
         memo: Memo::new(reset_after_close),
         provider: Arc::new(provider),
      }
   }

   /// Returns the cached value, computing it on the first call.
   ///
   /// Once computed, the fast path takes no lock.
   #[inline]
   pub fn get(&self) -> Arc<T> {
      match self.memo.get_or_try_init(|| Ok::<_, Infallible>((self.provider)())) {
         Ok(value) => value,
         Err(never) => match never {},
      }
   }

   /// Returns the cached value if one is readable right now. Never blocks and
   /// never runs the provider.
   #[inline]
   pub fn peek(&self) -> Option<Arc<T>> {
      self.memo.peek()
   }

   /// Checks whether a value is cached.
   ///
   /// This is a snapshot; a concurrent `get` or `try_close` may change it
   /// right after it returns.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.memo.is_initialized()
   }

   /// Whether [`try_close`](Self::try_close) empties the cell.
   #[inline]
   pub fn resets_after_close(&self) -> bool {
      self.memo.reset_after_close()
   }

   /// Runs `action` on the cached value, if there is one.
   ///
   /// Waits for an in-flight computation to finish first. An error from
   /// `action` is returned as is and does not affect the cell.
   pub fn if_present<F, E>(&self, action: F) -> Result<(), E>
   where
      F: FnOnce(&T) -> Result<(), E>,
   {
      self.memo.if_present(action)
   }

   /// Applies `f` to the cached value. Returns `None` without calling `f` (or
   /// the provider) when the cell is empty.
   pub fn map<U, F>(&self, f: F) -> Option<U>
   where
      F: FnOnce(&T) -> U,
   {
      self.memo.map(|value| Some(f(value)))
   }

   /// Like [`map`](Self::map), for functions that may themselves produce nothing.
   pub fn and_then<U, F>(&self, f: F) -> Option<U>
   where
      F: FnOnce(&T) -> Option<U>,
   {
      self.memo.map(f)
   }

   /// Empties the cell if it was built to reset after close. A sticky cell
   /// keeps its value.
   pub fn try_close(&self) {
      let _ = self.try_close_with(|_| Ok::<_, Infallible>(()));
   }

   /// Hands the cached value to `close` and then, for a resetting cell, empties
   /// it so the next [`get`](Self::get) recomputes. Does nothing on an empty cell.
   ///
   /// If `close` fails the error is returned and the cell keeps its value.
   pub fn try_close_with<F, E>(&self, close: F) -> Result<(), E>
   where
      F: FnOnce(&T) -> Result<(), E>,
   {
      self.memo.try_close(close)
   }

   /// Creates a new, empty cell sharing this cell's provider and reset
   /// behavior. The cached value is never carried over.
   #[must_use]
   pub fn fork(&self) -> Self {
      Self {
         memo: Memo::new(self.memo.reset_after_close()),
         provider: Arc::clone(&self.provider),
      }
   }

   /// Async flavor of [`get`](Self::get).
   ///
   /// Returns immediately when the value is cached; otherwise runs the blocking
   /// path inside [`tokio::task::block_in_place`]. Must be called from a
   /// multi-threaded runtime.
   #[cfg(feature = "async-tokio-mt")]
   pub async fn get_async(&self) -> Arc<T> {
      if let Some(value) = self.peek() {
         return value;
      }
      tokio::task::block_in_place(|| self.get())
   }
}

impl<T: fmt::Display> fmt::Display for Lazy<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self.peek() {
         Some(v) => fmt::Display::fmt(&*v, f),
         None => f.write_str("<uninit>"),
      }
   }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Lazy");
      match self.peek() {
         Some(v) => d.field(&*v),
         None => d.field(&format_args!("<uninit>")),
      };
      d.finish()
   }
}
