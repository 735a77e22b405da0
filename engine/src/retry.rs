// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bounded retries at a constant pace.

use backoff::backoff::Constant;
use backoff::future::retry_notify;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub use backoff::Error as BackoffError;

/// The last failure of an operation retried until its budget ran out.
#[derive(Debug, Error)]
#[error("{label} still failing after {tries} tries")]
pub struct Exhausted<E: std::error::Error + 'static> {
    pub label: String,
    pub tries: u32,
    #[source]
    pub last: E,
}

/// Run `op` up to `tries` times, waiting `delay` between attempts, until it
/// succeeds. When every attempt fails, the last error is returned.
pub async fn retry<T, E, F, Fut>(
    label: &str,
    tries: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, Exhausted<E>>
where
    E: std::error::Error + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let tries = tries.max(1);
    let attempt = AtomicU32::new(0);
    let bounded = || {
        let last = attempt.fetch_add(1, Ordering::Relaxed) + 1 >= tries;
        let fut = op();
        async move {
            fut.await.map_err(|e| {
                if last {
                    BackoffError::permanent(e)
                } else {
                    BackoffError::transient(e)
                }
            })
        }
    };
    let notify = |e: E, after: Duration| {
        debug!(
            "{label}: attempt {}/{tries} failed, retrying in {after:?}: {e}",
            attempt.load(Ordering::Relaxed)
        );
    };
    match retry_notify(Constant::new(delay), bounded, notify).await {
        Ok(value) => {
            let attempt = attempt.load(Ordering::Relaxed);
            if attempt > 1 {
                info!("{label}: succeeded on attempt {attempt}/{tries}");
            }
            Ok(value)
        }
        Err(last) => Err(Exhausted {
            label: label.to_string(),
            tries,
            last,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use std::cell::Cell;
    use tracing_test::traced_test;

    fn failure(n: u32) -> EngineError {
        EngineError::Params(format!("attempt {n}"))
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_retry_converges() {
        let calls = Cell::new(0);
        let start = tokio::time::Instant::now();
        let value = retry("link up", 5, Duration::from_secs(10), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { if n < 3 { Err(failure(n)) } else { Ok(n) } }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
        assert!(logs_contain("link up: attempt 2/5 failed, retrying in 10s"));
        assert!(logs_contain("link up: succeeded on attempt 3/5"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let calls = Cell::new(0);
        let start = tokio::time::Instant::now();
        let err = retry("link up", 4, Duration::from_secs(1), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Err::<(), _>(failure(n)) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.get(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(err.tries, 4);
        assert_eq!(err.last.to_string(), "Invalid engine parameters: attempt 4");
        assert_eq!(err.to_string(), "link up still failing after 4 tries");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_single_try() {
        let calls = Cell::new(0);
        let err = retry("once", 0, Duration::from_secs(1), || {
            calls.set(calls.get() + 1);
            async { Err::<(), _>(failure(1)) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert_eq!(err.tries, 1);
    }
}
