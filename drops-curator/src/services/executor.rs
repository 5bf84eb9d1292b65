//! Bounded task executor
//!
//! Caps the number of concurrently running tasks with a semaphore and,
//! optionally, throttles task starts with a token-bucket rate limiter.
//! Every task is tracked: `submit` hands back a [`JoinHandle`] so the caller
//! observes completion, failure or panic.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone)]
pub struct BoundedExecutor {
    semaphore: Arc<Semaphore>,
    rate_limiter: Option<Arc<DirectLimiter>>,
}

impl BoundedExecutor {
    /// `concurrency` of 0 is treated as 1; `rate_per_second` of `None` or 0
    /// disables throttling
    pub fn new(concurrency: usize, rate_per_second: Option<u32>) -> Self {
        let rate_limiter = rate_per_second
            .and_then(NonZeroU32::new)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));

        Self {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            rate_limiter,
        }
    }

    /// Run `task` once a permit (and a rate token) is available
    pub fn submit<F, T>(&self, task: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let rate_limiter = self.rate_limiter.clone();

        tokio::spawn(async move {
            // The semaphore is never closed, so acquiring only waits
            let _permit = semaphore.acquire_owned().await.ok();
            if let Some(limiter) = rate_limiter {
                limiter.until_ready().await;
            }
            task.await
        })
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
