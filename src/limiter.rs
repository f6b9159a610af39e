//! Bounded-parallelism task runner
//!
//! The mirror and clean engines schedule every fetch, write, and delete
//! through a [`Limiter`], which caps the number of simultaneously in-flight
//! operations. The limiter is backed by a fair [`tokio::sync::Semaphore`], so
//! queued tasks start in FIFO order as slots free up.
//!
//! A limiter instance is cheap to clone (the permit pool is shared) and
//! reusable indefinitely across unrelated batches. A failing task releases
//! its slot on drop like any other; it cannot corrupt the queue or block
//! unrelated work.

use crate::error::{MirrorError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Concurrency bound for a batch of operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// At most this many operations in flight at once (must be positive)
    Bounded(usize),
    /// No limit; every task starts immediately
    Unbounded,
}

impl Concurrency {
    /// Default bound used when callers do not specify one
    pub const DEFAULT: Concurrency = Concurrency::Bounded(8);
}

impl Default for Concurrency {
    fn default() -> Self {
        Concurrency::DEFAULT
    }
}

/// Task runner enforcing a concurrency bound
///
/// # Examples
///
/// ```rust
/// use ucd_mirror::limiter::{Concurrency, Limiter};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ucd_mirror::Result<()> {
/// let limiter = Limiter::new(Concurrency::Bounded(2))?;
/// let value = limiter.run(async { 40 + 2 }).await;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Limiter {
    semaphore: Option<Arc<Semaphore>>,
    limit: Concurrency,
}

impl Limiter {
    /// Create a limiter with the given bound
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::InvalidArgument`] for `Bounded(0)`; a batch that
    /// can never start is a caller bug, not an empty schedule.
    pub fn new(limit: Concurrency) -> Result<Self> {
        let semaphore = match limit {
            Concurrency::Bounded(0) => {
                return Err(MirrorError::invalid_argument(
                    "concurrency must be a positive integer or Unbounded",
                ));
            }
            Concurrency::Bounded(n) => Some(Arc::new(Semaphore::new(n))),
            Concurrency::Unbounded => None,
        };
        Ok(Limiter { semaphore, limit })
    }

    /// The bound this limiter was created with
    pub fn limit(&self) -> Concurrency {
        self.limit
    }

    /// Number of slots currently free (`None` when unbounded)
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Run a task, waiting for a free slot if the bound is reached
    ///
    /// The slot is held for the task's entire execution and released when it
    /// completes, whether it succeeds, fails, or is dropped mid-flight.
    pub async fn run<F>(&self, task: F) -> F::Output
    where
        F: Future,
    {
        let _permit = match &self.semaphore {
            // The semaphore is never closed, so acquire can only fail if the
            // limiter itself is gone.
            Some(s) => Some(s.acquire().await.expect("limiter semaphore closed")),
            None => None,
        };
        task.await
    }
}
