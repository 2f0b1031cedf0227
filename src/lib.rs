//! Thread-safe memoizing value providers.
//!
//! This crate wraps an expensive computation (a *provider*) so that it runs
//! once, is cached, and is shared across threads:
//!
//! - [`Lazy<T>`]: computes on first [`get`](Lazy::get), caches the result as an
//!   `Arc<T>`, and can be inspected, closed and optionally reset.
//! - [`TryLazy<T, E>`]: the same cell for providers returning `Result<T, E>`.
//!   Failures go back to the caller and are never cached.
//! - [`AsyncLazy<T>`]: starts the computation on a dedicated thread and lets
//!   callers wait for it with a deadline measured from the first call. Callers
//!   that run out of time get a value from a pending provider instead.
//!
//! The synchronous cells use a packed atomic state with `parking_lot`'s
//! futex-based parking: reading a computed value takes no lock, and at most
//! one provider call is in flight at a time.
//!
//! # Examples
//!
//! ## Resettable memoized value
//!
//! ```rust
//! use memo_once::lazy;
//!
//! let connection = lazy(|| format!("conn-{}", 1));
//! let first = connection.get();
//!
//! // Closing hands the value to a teardown action, then empties the cell.
//! connection.try_close_with(|c| {
//!    println!("closing {c}");
//!    Ok::<_, std::io::Error>(())
//! }).unwrap();
//! assert!(!connection.is_initialized());
//! assert_eq!(*connection.get(), *first);
//! ```
//!
//! ## Warm-up with a deadline
//!
//! ```rust
//! use std::time::Duration;
//! use memo_once::async_lazy;
//!
//! let index = async_lazy(
//!    || {
//!       std::thread::sleep(Duration::from_millis(100));
//!       vec![1, 2, 3]
//!    },
//!    Vec::new,
//!    Some("index-warmup"),
//! );
//!
//! // Not ready within 5ms of the first call: served the pending value.
//! assert!(index.get_timeout(Some(Duration::from_millis(5))).is_empty());
//! // Unbounded wait for the real value.
//! assert_eq!(index.get(), vec![1, 2, 3]);
//! ```

/// Error type for the warm-up cell.
mod error;

/// Free-function constructors and re-wrap handling.
mod factory;

/// Single-shot completion signal.
mod latch;

/// Memoized value with an infallible provider.
mod lazy;

/// Shared memoization core.
mod memo;

/// Internal synchronization state management.
mod state;

/// Memoized value with a fallible provider.
mod try_lazy;

/// Background warm-up cell.
mod warmup;

pub use error::WarmupError;
pub use factory::{async_lazy, lazy, lazy_ex, lazy_ex_with, lazy_with, IntoLazy, IntoTryLazy};
pub use lazy::Lazy;
pub use try_lazy::TryLazy;
pub use warmup::{AsyncLazy, AsyncLazyBuilder};
