//! FIFO request queue with a minimum spacing between calls.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

/// Runs queued operations one at a time, in arrival order.
///
/// Each operation starts no earlier than `min_interval` after the previous one
/// completed. A failed operation only fails its own caller.
pub struct RequestQueue {
    min_interval: Duration,
    // tokio's Mutex hands out the lock in FIFO order.
    last_completed: Mutex<Option<Instant>>,
}

impl RequestQueue {
    /// Create a queue enforcing the given spacing between calls.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_completed: Mutex::new(None),
        }
    }

    /// The configured spacing between calls.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for this operation's turn, run it, and return its result.
    pub async fn enqueue<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_completed = self.last_completed.lock().await;

        if let Some(previous) = *last_completed {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                debug!(
                    "Throttling backend call for {:?}",
                    ready_at.saturating_duration_since(Instant::now())
                );
                sleep_until(ready_at).await;
            }
        }

        let result = operation().await;
        *last_completed = Some(Instant::now());

        if let Err(e) = &result {
            warn!("Queued backend call failed: {}", e);
        }

        result
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LecternError;
    use std::sync::Mutex as StdMutex;

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced_and_fifo() {
        let queue = RequestQueue::new(Duration::from_millis(500));
        let log: StdMutex<Vec<(u32, Instant)>> = StdMutex::new(Vec::new());
        let origin = Instant::now();

        let record = |id: u32| {
            let log = &log;
            move || async move {
                log.lock().unwrap().push((id, Instant::now()));
                Ok::<_, LecternError>(id)
            }
        };

        let (a, b, c) = tokio::join!(
            queue.enqueue(record(1)),
            queue.enqueue(record(2)),
            queue.enqueue(record(3)),
        );
        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (1, 2, 3));

        let log = log.into_inner().unwrap();
        let order: Vec<u32> = log.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![1, 2, 3]);

        assert_eq!(log[0].1 - origin, Duration::ZERO);
        assert!(log[1].1 - log[0].1 >= Duration::from_millis(500));
        assert!(log[2].1 - log[1].1 >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_block_queue() {
        let queue = RequestQueue::new(Duration::from_millis(500));

        let (failed, ok) = tokio::join!(
            queue.enqueue(|| async { Err::<u32, _>(LecternError::Backend("boom".into())) }),
            queue.enqueue(|| async { Ok(7) }),
        );

        assert!(matches!(failed, Err(LecternError::Backend(_))));
        assert_eq!(ok.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_idle_period() {
        let queue = RequestQueue::new(Duration::from_millis(500));
        queue.enqueue(|| async { Ok(()) }).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;

        let before = Instant::now();
        queue.enqueue(|| async { Ok(()) }).await.unwrap();
        assert_eq!(Instant::now() - before, Duration::ZERO);
    }
}
