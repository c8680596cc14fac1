//! Retry controller: Fibonacci backoff over retryable attempt outcomes.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::error::RestError;

/// Ceiling on a single backoff wait, in seconds.
pub const MAX_BACKOFF_SECS: u64 = 70;

/// Fibonacci wait intervals (1, 1, 2, 3, 5, ... seconds), capped at
/// [`MAX_BACKOFF_SECS`].
#[derive(Debug)]
pub struct FibonacciBackoff {
    current: u64,
    next: u64,
    cap: u64,
}

impl FibonacciBackoff {
    pub fn new(cap_secs: u64) -> Self {
        Self {
            current: 1,
            next: 1,
            cap: cap_secs,
        }
    }

    /// The next wait interval. Stops growing once the cap is reached.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.cap);
        if self.current < self.cap {
            let after = self.current + self.next;
            self.current = self.next;
            self.next = after;
        }
        Duration::from_secs(delay)
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(MAX_BACKOFF_SECS)
    }
}

/// What a single attempt produced.
pub enum AttemptResult<T> {
    /// Terminal: success or a fatal error, handed straight back.
    Complete(Result<T, RestError>),
    /// Retryable condition; the string is logged as the reason.
    Retry(String),
}

/// Drives attempts until one completes.
///
/// Backoff state is local to the controller, which is local to one call;
/// nothing is shared across concurrent calls. There is no attempt ceiling:
/// retries continue until a terminal outcome or the caller cancels the
/// future.
pub struct RetryController {
    backoff: FibonacciBackoff,
}

impl RetryController {
    pub fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::default(),
        }
    }

    pub async fn run<F, Fut, T>(mut self, mut operation: F) -> Result<T, RestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AttemptResult<T>>,
    {
        let mut attempt: u64 = 1;
        loop {
            match operation().await {
                AttemptResult::Complete(result) => return result,
                AttemptResult::Retry(reason) => {
                    let delay = self.backoff.next_delay();
                    warn!(
                        "attempt {} failed ({}), retrying in {}s...",
                        attempt,
                        reason,
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fibonacci_sequence() {
        let mut backoff = FibonacciBackoff::default();
        let delays: Vec<u64> = (0..8).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 1, 2, 3, 5, 8, 13, 21]);
    }

    #[test]
    fn test_fibonacci_caps_at_ceiling() {
        let mut backoff = FibonacciBackoff::default();
        let last = (0..30).map(|_| backoff.next_delay().as_secs()).last().unwrap();
        assert_eq!(last, MAX_BACKOFF_SECS);

        // once capped it stays capped
        assert_eq!(backoff.next_delay().as_secs(), MAX_BACKOFF_SECS);
        assert_eq!(backoff.next_delay().as_secs(), MAX_BACKOFF_SECS);
    }

    #[test]
    fn test_fibonacci_custom_cap() {
        let mut backoff = FibonacciBackoff::new(4);
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 1, 2, 3, 4, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_first_completion() {
        let result = RetryController::new()
            .run(|| async { AttemptResult::Complete(Ok::<_, RestError>(7)) })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_propagates_fatal_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result: Result<(), _> = RetryController::new()
            .run(|| {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    AttemptResult::Complete(Err(RestError::ClientError { status: 404 }))
                }
            })
            .await;

        assert!(matches!(result, Err(RestError::ClientError { status: 404 })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result = RetryController::new()
            .run(|| {
                let calls = calls_clone.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 3 {
                        AttemptResult::Retry(format!("transient {}", n))
                    } else {
                        AttemptResult::Complete(Ok::<_, RestError>("done"))
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_between_attempts() {
        let start = tokio::time::Instant::now();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let _ = RetryController::new()
            .run(|| {
                let calls = calls_clone.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                        AttemptResult::Retry("rate limited".to_string())
                    } else {
                        AttemptResult::Complete(Ok::<_, RestError>(()))
                    }
                }
            })
            .await;

        // waits of 1 + 1 + 2 seconds under paused time
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }
}
