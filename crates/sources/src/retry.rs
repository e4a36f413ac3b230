//! Retry with exponential backoff for transient source failures

use crate::errors::SourceResult;
use backoff::{future::retry, ExponentialBackoff};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Retry a source call, backing off exponentially between attempts.
///
/// Retryable errors are retried at most `max_retries` times after the
/// first failure; everything else short-circuits.
pub async fn with_retry<T, Fut, Op>(
    max_retries: u32,
    base_delay: Duration,
    mut operation: Op,
) -> SourceResult<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = SourceResult<T>>,
{
    let attempts = AtomicU32::new(0);
    let policy = ExponentialBackoff {
        initial_interval: base_delay,
        max_interval: Duration::from_secs(30),
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    };

    retry(policy, || {
        let future = operation();
        let attempts = &attempts;
        async move {
            match future.await {
                Ok(value) => Ok(value),
                Err(err)
                    if err.is_retryable()
                        && attempts.fetch_add(1, Ordering::Relaxed) < max_retries =>
                {
                    tracing::warn!(
                        source = err.source_name(),
                        attempt = attempts.load(Ordering::Relaxed),
                        error = %err,
                        "source request failed, retrying"
                    );
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        }
    })
    .await
}
