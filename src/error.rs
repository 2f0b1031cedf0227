use std::io;

use thiserror::Error;

/// Error returned by [`AsyncLazy::try_get_timeout`](crate::AsyncLazy::try_get_timeout).
#[derive(Debug, Error)]
pub enum WarmupError {
   /// The operating system refused to start the background worker.
   #[error("failed to spawn warm-up worker: {0}")]
   Spawn(#[source] io::Error),
}
