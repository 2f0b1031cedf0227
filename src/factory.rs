//! Free-function constructors.
//!
//! `lazy` and `lazy_ex` accept either a provider or a cell that already wraps
//! one. An existing cell is returned unchanged instead of being wrapped twice,
//! and keeps its own reset-after-close setting.

use crate::{AsyncLazy, Lazy, TryLazy};

/// Anything that can become a [`Lazy<T>`].
pub trait IntoLazy<T> {
   fn into_lazy(self, reset_after_close: bool) -> Lazy<T>;
}

impl<T, F> IntoLazy<T> for F
where
   F: Fn() -> T + Send + Sync + 'static,
{
   #[inline]
   fn into_lazy(self, reset_after_close: bool) -> Lazy<T> {
      Lazy::with_reset(self, reset_after_close)
   }
}

impl<T> IntoLazy<T> for Lazy<T> {
   #[inline]
   fn into_lazy(self, _reset_after_close: bool) -> Lazy<T> {
      self
   }
}

/// Anything that can become a [`TryLazy<T, E>`].
pub trait IntoTryLazy<T, E> {
   fn into_try_lazy(self, reset_after_close: bool) -> TryLazy<T, E>;
}

impl<T, E, F> IntoTryLazy<T, E> for F
where
   F: Fn() -> Result<T, E> + Send + Sync + 'static,
{
   #[inline]
   fn into_try_lazy(self, reset_after_close: bool) -> TryLazy<T, E> {
      TryLazy::with_reset(self, reset_after_close)
   }
}

impl<T, E> IntoTryLazy<T, E> for TryLazy<T, E> {
   #[inline]
   fn into_try_lazy(self, _reset_after_close: bool) -> TryLazy<T, E> {
      self
   }
}

/// Wraps `supplier` in a [`Lazy`] that resets after close.
///
/// ```rust
/// use memo_once::{lazy, Lazy};
///
/// let cell: Lazy<u32> = lazy(|| 7);
/// let value = cell.get();
/// let same = lazy(cell);
/// assert!(std::sync::Arc::ptr_eq(&value, &same.get()));
/// ```
#[inline]
pub fn lazy<T, S: IntoLazy<T>>(supplier: S) -> Lazy<T> {
   supplier.into_lazy(true)
}

/// Wraps `supplier` in a [`Lazy`] with the given reset-after-close behavior.
#[inline]
pub fn lazy_with<T, S: IntoLazy<T>>(supplier: S, reset_after_close: bool) -> Lazy<T> {
   supplier.into_lazy(reset_after_close)
}

/// Wraps a fallible `supplier` in a [`TryLazy`] that resets after close.
#[inline]
pub fn lazy_ex<T, E, S: IntoTryLazy<T, E>>(supplier: S) -> TryLazy<T, E> {
   supplier.into_try_lazy(true)
}

/// Wraps a fallible `supplier` in a [`TryLazy`] with the given reset-after-close behavior.
#[inline]
pub fn lazy_ex_with<T, E, S: IntoTryLazy<T, E>>(
   supplier: S,
   reset_after_close: bool,
) -> TryLazy<T, E> {
   supplier.into_try_lazy(reset_after_close)
}

/// Builds an [`AsyncLazy`], naming its worker thread if `worker_name` is given.
pub fn async_lazy<T, F, P>(inner: F, pending: P, worker_name: Option<&str>) -> AsyncLazy<T>
where
   T: Clone + Send + Sync + 'static,
   F: Fn() -> T + Send + Sync + 'static,
   P: Fn() -> T + Send + Sync + 'static,
{
   let builder = AsyncLazy::builder(inner, pending);
   match worker_name {
      Some(name) => builder.worker_name(name),
      None => builder,
   }
   .build()
}
