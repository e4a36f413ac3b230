//! Bounded-concurrency item processing shared by the batch handlers
//!
//! Items fan out over a worker pool; per-item failures are counted and
//! sampled, infrastructure faults stop intake and abort the run. The
//! cancel flag and run budget are checked between items, never mid-item.

use super::{ItemError, JobError, RunContext, RunStats};
use futures::stream::{self, StreamExt};
use paperpulse_common::errors::AppError;
use std::future::{ready, Future};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

/// Process `items` with at most `workers` in flight.
///
/// Each item resolves to `Ok` (processed), a counted [`ItemError`], or
/// an infrastructure fault that stops further intake and fails the
/// whole run. Items already in flight when intake stops still finish.
pub async fn process_items<I, F, Fut>(
    ctx: &RunContext,
    workers: usize,
    items: Vec<I>,
    handle: F,
) -> Result<RunStats, JobError>
where
    I: Send,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<(), ItemError>>,
{
    let planned = match ctx.params.limit {
        Some(limit) => items.len().min(limit),
        None => items.len(),
    };

    let processed = AtomicI32::new(0);
    let failed = AtomicI32::new(0);
    let samples: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let infra: Mutex<Option<AppError>> = Mutex::new(None);

    stream::iter(items.into_iter().take(planned))
        .take_while(|_| {
            let aborted = match infra.lock() {
                Ok(guard) => guard.is_some(),
                Err(_) => true,
            };
            ready(!ctx.should_stop() && !aborted)
        })
        .map(&handle)
        .buffer_unordered(workers.max(1))
        .for_each(|result| {
            match result {
                Ok(()) => {
                    processed.fetch_add(1, Ordering::Relaxed);
                }
                Err(ItemError::Infrastructure(e)) => {
                    tracing::error!(error = %e, "item hit infrastructure fault");
                    if let Ok(mut guard) = infra.lock() {
                        guard.get_or_insert(e);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "item failed");
                    failed.fetch_add(1, Ordering::Relaxed);
                    if let Ok(mut guard) = samples.lock() {
                        if guard.len() < ctx.error_sample_cap() {
                            guard.push(e.to_string());
                        }
                    }
                }
            }
            ready(())
        })
        .await;

    if let Some(e) = infra.into_inner().ok().flatten() {
        return Err(JobError::Infrastructure(e));
    }

    let processed = processed.into_inner();
    let failed = failed.into_inner();
    let stopped_early = ctx.should_stop() && ((processed + failed) as usize) < planned;

    Ok(RunStats {
        processed,
        failed,
        samples: samples.into_inner().unwrap_or_default(),
        stopped_early,
    })
}
