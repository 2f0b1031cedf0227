//! Asynchronously warmed-up value with a bounded wait.
//!
//! The first [`AsyncLazy::get_timeout`] call starts the computation on a
//! dedicated thread. Every caller then waits for it, but never past
//! `first trigger + timeout`; a caller that runs out of time receives a value
//! from the pending provider while the computation keeps going.
//!
//! ```text
//! UNINITIALIZED --first get--> INITIALIZING --worker ok---> INITIALIZED
//!       ^                            |
//!       +-------- worker panics -----+
//! ```

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::WarmupError;
use crate::latch::Latch;

type Provider<T> = Box<dyn Fn() -> T + Send + Sync>;

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const INITIALIZED: u8 = 2;

/// One launch of the background computation.
#[derive(Clone)]
struct Episode {
   started: Instant,
   done: Arc<Latch>,
}

struct Shared<T> {
   inner: Provider<T>,
   pending: Provider<T>,
   worker_name: Option<String>,
   status: AtomicU8,
   value: OnceLock<T>,
   /// Written only while INITIALIZING is entered, under this lock.
   episode: Mutex<Option<Episode>>,
}

/// A value computed once on a background thread, with a pending fallback for
/// callers that cannot wait.
///
/// Worker failures (panics in the inner provider) are not cached: the cell goes
/// back to uninitialized and the next call starts a new attempt. The pending
/// provider is never cached either; it runs on the calling thread for every
/// caller that times out.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use memo_once::AsyncLazy;
///
/// let report = AsyncLazy::new(
///    || {
///       std::thread::sleep(Duration::from_millis(200));
///       "done".to_string()
///    },
///    || "waiting".to_string(),
/// );
///
/// assert_eq!(report.get_timeout(Some(Duration::from_millis(10))), "waiting");
/// assert_eq!(report.get(), "done");
/// ```
pub struct AsyncLazy<T> {
   shared: Arc<Shared<T>>,
}

/// Configures an [`AsyncLazy`].
pub struct AsyncLazyBuilder<T> {
   inner: Provider<T>,
   pending: Provider<T>,
   worker_name: Option<String>,
}

impl<T> AsyncLazyBuilder<T> {
   /// Names the background worker thread.
   #[must_use]
   pub fn worker_name(mut self, name: impl Into<String>) -> Self {
      self.worker_name = Some(name.into());
      self
   }

   #[must_use]
   pub fn build(self) -> AsyncLazy<T> {
      AsyncLazy {
         shared: Arc::new(Shared {
            inner: self.inner,
            pending: self.pending,
            worker_name: self.worker_name,
            status: AtomicU8::new(UNINITIALIZED),
            value: OnceLock::new(),
            episode: Mutex::new(None),
         }),
      }
   }
}

impl<T> AsyncLazy<T>
where
   T: Clone + Send + Sync + 'static,
{
   /// Starts a builder from the inner and pending providers.
   pub fn builder<F, P>(inner: F, pending: P) -> AsyncLazyBuilder<T>
   where
      F: Fn() -> T + Send + Sync + 'static,
      P: Fn() -> T + Send + Sync + 'static,
   {
      AsyncLazyBuilder {
         inner: Box::new(inner),
         pending: Box::new(pending),
         worker_name: None,
      }
   }

   /// Creates a cell with an unnamed worker.
   #[must_use]
   pub fn new<F, P>(inner: F, pending: P) -> Self
   where
      F: Fn() -> T + Send + Sync + 'static,
      P: Fn() -> T + Send + Sync + 'static,
   {
      Self::builder(inner, pending).build()
   }

   /// Creates a cell that serves `T::default()` to callers that time out.
   #[must_use]
   pub fn with_default_pending<F>(inner: F) -> Self
   where
      F: Fn() -> T + Send + Sync + 'static,
      T: Default,
   {
      Self::new(inner, T::default)
   }

   /// Checks whether the value has been computed. Never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.shared.status.load(Ordering::Acquire) == INITIALIZED
   }

   /// Checks whether a worker is currently running. Never blocks.
   #[inline]
   pub fn is_initializing(&self) -> bool {
      self.shared.status.load(Ordering::Acquire) == INITIALIZING
   }

   /// Returns the computed value, starting the computation if needed and
   /// waiting for it without bound.
   ///
   /// The pending value is still returned if the worker fails.
   #[inline]
   pub fn get(&self) -> T {
      self.get_timeout(None)
   }

   /// Returns the computed value, or the pending value once `timeout` has
   /// elapsed since the call that started the current computation.
   ///
   /// The budget is shared: a caller arriving 40ms into a 50ms budget waits
   /// at most 10ms. `None` waits without bound.
   pub fn get_timeout(&self, timeout: Option<Duration>) -> T {
      match self.try_get_timeout(timeout) {
         Ok(value) => value,
         Err(err) => {
            warn!(error = %err, "serving pending value");
            (self.shared.pending)()
         }
      }
   }

   /// Like [`get_timeout`](Self::get_timeout), but reports a worker thread
   /// that could not be started instead of serving the pending value.
   pub fn try_get_timeout(&self, timeout: Option<Duration>) -> Result<T, WarmupError> {
      if let Some(value) = self.shared.value.get() {
         return Ok(value.clone());
      }
      let episode = self.enter()?;
      let deadline = timeout.and_then(|t| episode.started.checked_add(t));
      episode.done.wait(deadline);

      if let Some(value) = self.shared.value.get() {
         return Ok(value.clone());
      }
      trace!(
         elapsed = ?episode.started.elapsed(),
         "warm-up not ready, serving pending value"
      );
      Ok((self.shared.pending)())
   }

   /// Async flavor of [`get_timeout`](Self::get_timeout).
   ///
   /// Returns immediately when the value is ready; otherwise waits inside
   /// [`tokio::task::block_in_place`]. Must be called from a multi-threaded
   /// runtime.
   #[cfg(feature = "async-tokio-mt")]
   pub async fn get_timeout_async(&self, timeout: Option<Duration>) -> T {
      if let Some(value) = self.shared.value.get() {
         return value.clone();
      }
      tokio::task::block_in_place(|| self.get_timeout(timeout))
   }

   /// Returns the running episode, launching a new one if the cell is idle.
   fn enter(&self) -> Result<Episode, WarmupError> {
      let mut slot = self
         .shared
         .episode
         .lock()
         .unwrap_or_else(PoisonError::into_inner);

      // Re-check under the lock: another caller may have launched or finished.
      if self.shared.status.load(Ordering::Acquire) != UNINITIALIZED {
         if let Some(episode) = slot.as_ref() {
            return Ok(episode.clone());
         }
      }

      let episode = Episode {
         started: Instant::now(),
         done: Arc::new(Latch::new()),
      };
      *slot = Some(episode.clone());
      self.launch(&episode)?;
      Ok(episode)
   }

   /// Spawns the worker for `episode`. Caller holds the episode lock.
   fn launch(&self, episode: &Episode) -> Result<(), WarmupError> {
      self.shared.status.store(INITIALIZING, Ordering::Release);
      let worker = Worker {
         shared: Arc::clone(&self.shared),
         episode: episode.clone(),
      };

      let mut builder = thread::Builder::new();
      if let Some(name) = &self.shared.worker_name {
         builder = builder.name(name.clone());
      }
      // On failure the closure is dropped, and `Worker::drop` rolls the episode back.
      let _detached = builder
         .spawn(move || worker.run())
         .map_err(WarmupError::Spawn)?;

      debug!(worker = ?self.shared.worker_name, "warm-up worker launched");
      Ok(())
   }
}

/// Owns one episode on the worker thread.
///
/// Dropping it publishes the outcome: anything short of INITIALIZED becomes
/// UNINITIALIZED again, and the latch is released last.
struct Worker<T> {
   shared: Arc<Shared<T>>,
   episode: Episode,
}

impl<T> Worker<T> {
   fn run(self) {
      let value = (self.shared.inner)();
      if self.shared.value.set(value).is_ok() {
         self.shared.status.store(INITIALIZED, Ordering::Release);
         debug!(elapsed = ?self.episode.started.elapsed(), "warm-up finished");
      }
   }
}

impl<T> Drop for Worker<T> {
   fn drop(&mut self) {
      if self.shared.status.load(Ordering::Acquire) != INITIALIZED {
         self.shared.status.store(UNINITIALIZED, Ordering::Release);
         debug!(
            elapsed = ?self.episode.started.elapsed(),
            "warm-up failed, next caller retries"
         );
      }
      self.episode.done.release();
   }
}

impl<T: fmt::Debug> fmt::Debug for AsyncLazy<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("AsyncLazy");
      match self.shared.value.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<uninit>")),
      };
      d.finish()
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_dropped_worker_rolls_back_episode() {
      let cell = AsyncLazy::new(|| 1u32, || 0);
      let episode = Episode {
         started: Instant::now(),
         done: Arc::new(Latch::new()),
      };
      *cell.shared.episode.lock().unwrap() = Some(episode.clone());
      cell.shared.status.store(INITIALIZING, Ordering::Release);

      // What a failed spawn leaves behind: the worker dropped without running.
      drop(Worker {
         shared: Arc::clone(&cell.shared),
         episode: episode.clone(),
      });

      assert!(!cell.is_initializing());
      assert!(!cell.is_initialized());
      assert!(episode.done.is_released());
      // The next caller starts a fresh episode.
      assert_eq!(cell.get(), 1);
      assert!(cell.is_initialized());
   }
}
