//! Memoized value with a fallible provider.
//!
//! [`TryLazy<T, E>`] behaves exactly like [`Lazy<T>`](crate::Lazy) except that
//! its provider returns `Result<T, E>` and [`get`](TryLazy::get) hands a
//! failure back to the caller. Failures are never cached.

use core::convert::Infallible;
use core::fmt;
use std::sync::Arc;

use crate::memo::Memo;

type Provider<T, E> = Arc<dyn Fn() -> Result<T, E> + Send + Sync>;

/// A thread-safe, resettable memoized value whose provider can fail.
///
/// # Examples
///
/// ```rust
/// use memo_once::TryLazy;
///
/// let port = TryLazy::new(|| "8080".parse::<u16>());
/// assert_eq!(*port.get().unwrap(), 8080);
/// ```
pub struct TryLazy<T, E> {
   memo: Memo<T>,
   provider: Provider<T, E>,
}

impl<T, E> TryLazy<T, E> {
   /// Creates an empty cell that resets after [`try_close`](Self::try_close).
   #[inline]
   #[must_use]
   pub fn new<F>(provider: F) -> Self
   where
      F: Fn() -> Result<T, E> + Send + Sync + 'static,
   {
      Self::with_reset(provider, true)
   }

   /// Creates an empty cell that keeps its value across
   /// [`try_close`](Self::try_close).
   #[inline]
   #[must_use]
   pub fn sticky<F>(provider: F) -> Self
   where
      F: Fn() -> Result<T, E> + Send + Sync + 'static,
   {
      Self::with_reset(provider, false)
   }

   /// Creates an empty cell with an explicit reset-after-close behavior.
   #[inline]
   #[must_use]
   pub fn with_reset<F>(provider: F, reset_after_close: bool) -> Self
   where
      F: Fn() -> Result<T, E> + Send + Sync + 'static,
   {
      Self {
         memo: Memo::new(reset_after_close),
         provider: Arc::new(provider),
      }
   }

   /// Returns the cached value, running the provider on the first call.
   ///
   /// - On `Ok(value)` the value is cached and shared with every later caller.
   /// - On `Err(e)` the error is returned and the cell stays empty; the next
   ///   call runs the provider again.
   #[inline]
   pub fn get(&self) -> Result<Arc<T>, E> {
      self.memo.get_or_try_init(|| (self.provider)())
   }

   /// Returns the cached value if one is readable right now. Never blocks.
   #[inline]
   pub fn peek(&self) -> Option<Arc<T>> {
      self.memo.peek()
   }

   /// Checks whether a value is cached. Snapshot only.
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
   pub fn if_present<F, E2>(&self, action: F) -> Result<(), E2>
   where
      F: FnOnce(&T) -> Result<(), E2>,
   {
      self.memo.if_present(action)
   }

   /// Applies `f` to the cached value, or returns `None` for an empty cell.
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

   /// Empties the cell if it was built to reset after close.
   pub fn try_close(&self) {
      let _ = self.try_close_with(|_| Ok::<_, Infallible>(()));
   }

   /// Hands the cached value to `close`, then empties a resetting cell.
   /// If `close` fails the error is returned and the cell keeps its value.
   pub fn try_close_with<F, E2>(&self, close: F) -> Result<(), E2>
   where
      F: FnOnce(&T) -> Result<(), E2>,
   {
      self.memo.try_close(close)
   }

   /// Creates a new, empty cell sharing this cell's provider and reset behavior.
   #[must_use]
   pub fn fork(&self) -> Self {
      Self {
         memo: Memo::new(self.memo.reset_after_close()),
         provider: Arc::clone(&self.provider),
      }
   }
}

// Rendering reads the cached value only; it never runs the provider and so
// cannot observe a provider failure.
impl<T: fmt::Display, E> fmt::Display for TryLazy<T, E> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self.peek() {
         Some(v) => fmt::Display::fmt(&*v, f),
         None => f.write_str("<uninit>"),
      }
   }
}

impl<T: fmt::Debug, E> fmt::Debug for TryLazy<T, E> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("TryLazy");
      match self.peek() {
         Some(v) => d.field(&*v),
         None => d.field(&format_args!("<uninit>")),
      };
      d.finish()
   }
}
