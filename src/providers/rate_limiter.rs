use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Duration, Instant};

/// Request pacing for outbound provider calls: bounded concurrency plus a
/// minimum spacing between request starts.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    last_request: Arc<Mutex<Option<Instant>>>,
    min_delay: Duration,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, requests_per_minute: u32) -> Self {
        let per_min = u64::from(requests_per_minute.max(1));
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            last_request: Arc::new(Mutex::new(None)),
            min_delay: Duration::from_millis(60_000 / per_min),
        }
    }

    /// Waits for a permit and for the spacing window. The permit is released
    /// when the guard drops, on every exit path of the caller.
    pub async fn acquire(&self) -> Result<RateLimitGuard> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .context("rate limiter closed")?;

        loop {
            let wait = {
                let mut last = self.last_request.lock();
                match *last {
                    Some(t) if t.elapsed() < self.min_delay => Some(self.min_delay - t.elapsed()),
                    _ => {
                        *last = Some(Instant::now());
                        None
                    }
                }
            };
            match wait {
                Some(d) => sleep(d).await,
                None => break,
            }
        }

        Ok(RateLimitGuard { _permit: permit })
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Holds one concurrency permit for the duration of a request.
#[derive(Debug)]
pub struct RateLimitGuard {
    _permit: OwnedSemaphorePermit,
}
