//! Throttling for calls to the generative backend.
//!
//! Every backend call from every room goes through one [`ApiGate`]: a FIFO
//! [`RequestQueue`] that spaces calls out, with a [`RetryPolicy`] applied inside
//! each queue slot so a rate-limited call holds its place while it backs off.

mod queue;
mod retry;

pub use queue::RequestQueue;
pub use retry::{with_retry, RetryPolicy};

use crate::config::ThrottleSettings;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Shared entry point for backend calls.
pub struct ApiGate {
    queue: RequestQueue,
    policy: RetryPolicy,
}

impl ApiGate {
    pub fn new(min_interval: Duration, policy: RetryPolicy) -> Self {
        Self {
            queue: RequestQueue::new(min_interval),
            policy,
        }
    }

    /// Build a gate from configuration.
    pub fn from_settings(settings: &ThrottleSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.min_interval_ms),
            RetryPolicy {
                max_retries: settings.max_retries,
                initial_delay: Duration::from_millis(settings.initial_delay_ms),
                backoff_factor: settings.backoff_factor,
            },
        )
    }

    /// Queue `operation` and run it with retries once its turn comes.
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.queue
            .enqueue(|| with_retry(&self.policy, operation))
            .await
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl Default for ApiGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LecternError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_retries_hold_the_queue_slot() {
        let gate = ApiGate::new(
            Duration::from_millis(500),
            RetryPolicy::new(1, Duration::from_millis(1000)),
        );
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let (first, second) = tokio::join!(
            gate.call(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(LecternError::RateLimited("429".into())) }
            }),
            gate.call(|| async { Ok(Instant::now()) }),
        );

        assert!(first.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // first slot: two attempts with a 1s backoff, then the 500ms spacing
        assert!(second.unwrap() - started >= Duration::from_millis(1500));
    }

    #[test]
    fn test_from_settings() {
        let gate = ApiGate::from_settings(&ThrottleSettings::default());
        assert_eq!(gate.policy().max_retries, 3);
        assert_eq!(gate.policy().delay_for(1), Duration::from_millis(2000));
    }
}
