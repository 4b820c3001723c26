use crate::{Error, ErrorContext, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Result of a retried operation plus how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

/// Bounded retry with a fixed backoff.
///
/// - Only transport failures ([`Error::is_transient`]) are retried.
/// - `retries` counts retries after the first attempt, so at most `retries + 1` attempts run.
/// - A cancellation token interrupts both an in-flight attempt and the backoff sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

fn cancelled(attempt: u32) -> Error {
    Error::network_with_context(
        "cancelled",
        "Request cancelled",
        ErrorContext::new()
            .with_details(format!("attempt {}", attempt))
            .with_source("retry_policy"),
    )
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the budget is spent.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, cancel: Option<&CancellationToken>, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let result = match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(cancelled(attempt)),
                        r = op(attempt) => r,
                    }
                }
                None => op(attempt).await,
            };

            match result {
                Err(e) if e.is_transient() && attempt <= self.retries => {
                    warn!(
                        attempt,
                        remaining = self.retries + 1 - attempt,
                        reason = e.reason(),
                        "transport failure, retrying: {}",
                        e
                    );
                    match cancel {
                        Some(token) => {
                            tokio::select! {
                                biased;
                                _ = token.cancelled() => {
                                    return Attempted { result: Err(cancelled(attempt)), attempts: attempt };
                                }
                                _ = tokio::time::sleep(self.backoff) => {}
                            }
                        }
                        None => tokio::time::sleep(self.backoff).await,
                    }
                }
                other => {
                    return Attempted {
                        result: other,
                        attempts: attempt,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky(failures: u32, calls: &AtomicU32) -> impl FnMut(u32) -> std::future::Ready<Result<&'static str>> + '_ {
        move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                std::future::ready(Err(Error::network("econnrefused", "Connection refused")))
            } else {
                std::future::ready(Ok("ok"))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn converges_after_k_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(200));
        for k in 0..3 {
            let calls = AtomicU32::new(0);
            let out = policy.run(None, flaky(k, &calls)).await;
            assert_eq!(out.result.unwrap(), "ok");
            assert_eq!(out.attempts, k + 1);
            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_retries_plus_one_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(200));
        for failures in [3, 4, 10] {
            let calls = AtomicU32::new(0);
            let out = policy.run(None, flaky(failures, &calls)).await;
            let err = out.result.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Network);
            assert_eq!(out.attempts, 3);
            assert_eq!(calls.load(Ordering::SeqCst), 3);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn last_retry_can_still_succeed() {
        let policy = RetryPolicy::new(2, Duration::from_millis(200));
        let calls = AtomicU32::new(0);
        let out = policy.run(None, flaky(2, &calls)).await;
        assert_eq!(out.result.unwrap(), "ok");
        assert_eq!(out.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_fixed() {
        let policy = RetryPolicy::new(2, Duration::from_millis(200));
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let out = policy.run(None, flaky(u32::MAX, &calls)).await;
        assert!(out.result.is_err());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(400), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(450), "{elapsed:?}");
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let calls = AtomicU32::new(0);
        let out: Attempted<()> = policy
            .run(None, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::http(500, "server_error", "boom")) }
            })
            .await;
        assert_eq!(out.attempts, 1);
        assert_eq!(out.result.unwrap_err().status(), Some(500));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let policy = RetryPolicy::new(100, Duration::from_secs(60));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(90)).await;
            canceller.cancel();
        });

        let calls = AtomicU32::new(0);
        let out = policy.run(Some(&token), flaky(u32::MAX, &calls)).await;
        let err = out.result.unwrap_err();
        assert_eq!(err.reason(), "cancelled");
        assert!(!err.is_transient());
        assert_eq!(out.attempts, 2);
    }

    #[tokio::test]
    async fn already_cancelled_runs_nothing() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);
        let out = policy.run(Some(&token), flaky(0, &calls)).await;
        assert_eq!(out.result.unwrap_err().reason(), "cancelled");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
