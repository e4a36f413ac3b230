//! Job orchestration
//!
//! Four recurring job kinds run the pipeline: discovery, metric
//! refresh, citation resolution, scoring. The orchestrator owns the
//! run lifecycle: the at-most-one-running-per-kind guard lives in the
//! store as a conditional insert (so it holds across processes), item
//! failures degrade a run to `partial` without aborting it, and only
//! infrastructure faults end a run `failed`.
//!
//! Wall-clock scheduling is external; cron invokes the binary, which
//! calls [`Orchestrator::run_now`].

mod citations;
mod discovery;
mod refresh;
mod runner;
mod scoring;

pub use citations::CitationResolutionHandler;
pub use discovery::DiscoveryHandler;
pub use refresh::MetricRefreshHandler;
pub use runner::process_items;
pub use scoring::ScoringHandler;

use async_trait::async_trait;
use paperpulse_common::db::models::{JobKind, JobRun, JobStatus};
use paperpulse_common::errors::AppError;
use paperpulse_common::metrics::record_job_run;
use paperpulse_common::store::{RunOutcome, Store};
use paperpulse_sources::SourceError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Infrastructure-level fault; aborts the run as `failed`
#[derive(Debug, Error)]
pub enum JobError {
    #[error("infrastructure fault: {0}")]
    Infrastructure(#[from] AppError),
}

/// Per-item failure; counted, sampled, never aborts the batch.
/// The infrastructure variant is the exception: the runner converts
/// it into a [`JobError`] and stops pulling items.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("infrastructure fault: {0}")]
    Infrastructure(#[from] AppError),
}

/// Operator-facing knobs for one run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunParams {
    /// Cap on items processed this run, for out-of-band triggers
    pub limit: Option<usize>,
}

/// Shared context threaded through a run's item processing
pub struct RunContext {
    cancel: Arc<AtomicBool>,
    deadline: Instant,
    error_sample_cap: usize,
    pub params: RunParams,
}

impl RunContext {
    pub fn new(
        cancel: Arc<AtomicBool>,
        run_budget: Duration,
        error_sample_cap: usize,
        params: RunParams,
    ) -> Self {
        Self {
            cancel,
            deadline: Instant::now() + run_budget,
            error_sample_cap,
            params,
        }
    }

    /// Checked between items: cancelled or past the run budget
    pub fn should_stop(&self) -> bool {
        self.cancel.load(Ordering::Relaxed) || Instant::now() >= self.deadline
    }

    pub fn error_sample_cap(&self) -> usize {
        self.error_sample_cap
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::new(
            Arc::new(AtomicBool::new(false)),
            Duration::from_secs(60),
            10,
            RunParams::default(),
        )
    }
}

/// Accounting a handler returns for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: i32,
    pub failed: i32,
    pub samples: Vec<String>,
    pub stopped_early: bool,
}

impl RunStats {
    /// Record one item failure, keeping at most `cap` sample messages
    pub fn record_failure(&mut self, cap: usize, message: String) {
        self.failed += 1;
        if self.samples.len() < cap {
            self.samples.push(message);
        }
    }

    /// Terminal status: any failure or an early stop degrades the run
    /// to partial; `failed` is reserved for infrastructure faults.
    pub fn status(&self) -> JobStatus {
        if self.failed > 0 || self.stopped_early {
            JobStatus::Partial
        } else {
            JobStatus::Succeeded
        }
    }

    pub fn merge(&mut self, other: RunStats) {
        self.processed += other.processed;
        self.failed += other.failed;
        self.samples.extend(other.samples);
        self.stopped_early |= other.stopped_early;
    }
}

/// One pipeline stage's batch logic
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn kind(&self) -> JobKind;

    async fn execute(&self, ctx: &RunContext) -> Result<RunStats, JobError>;
}

/// What a trigger produced
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// Run executed to completion (any terminal status)
    Completed(JobRun),
    /// Run started detached; the handle is still `running`
    Started(JobRun),
    /// A run of this kind was already in flight; logged no-op
    AlreadyRunning,
}

impl TriggerOutcome {
    pub fn run(&self) -> Option<&JobRun> {
        match self {
            TriggerOutcome::Completed(run) | TriggerOutcome::Started(run) => Some(run),
            TriggerOutcome::AlreadyRunning => None,
        }
    }
}

/// Owns run lifecycles for all job kinds
pub struct Orchestrator {
    store: Arc<dyn Store>,
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
    cancel: Arc<AtomicBool>,
    run_budget: Duration,
    error_sample_cap: usize,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, run_budget: Duration, error_sample_cap: usize) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            run_budget,
            error_sample_cap,
        }
    }

    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    /// Flag watched by in-flight runs; setting it stops them between
    /// items. Wired to SIGINT/SIGTERM by the binary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run one job kind to completion.
    ///
    /// Returns `AlreadyRunning` without queueing when a run of this
    /// kind is in flight. Store faults surface as errors; handler
    /// infrastructure faults finish the run as `failed` and still
    /// return its row.
    #[tracing::instrument(skip(self, params), fields(kind = %kind))]
    pub async fn run_now(
        &self,
        kind: JobKind,
        params: RunParams,
    ) -> Result<TriggerOutcome, AppError> {
        // Resolve the handler before taking the guard; a missing
        // handler must not leave a running row behind.
        let handler = self.handler_for(kind)?;
        let Some(run) = self.store.begin_run(kind).await? else {
            tracing::info!(kind = %kind, "run already in flight, trigger ignored");
            return Ok(TriggerOutcome::AlreadyRunning);
        };

        let ctx = RunContext::new(
            Arc::clone(&self.cancel),
            self.run_budget,
            self.error_sample_cap,
            params,
        );

        let finished =
            execute_run(Arc::clone(&self.store), handler, run.id, kind, ctx).await?;
        Ok(TriggerOutcome::Completed(finished))
    }

    /// Start a run detached and hand back its `running` row, for
    /// operator surfaces that poll status instead of waiting.
    pub async fn spawn(
        &self,
        kind: JobKind,
        params: RunParams,
    ) -> Result<TriggerOutcome, AppError> {
        let handler = self.handler_for(kind)?;
        let Some(run) = self.store.begin_run(kind).await? else {
            tracing::info!(kind = %kind, "run already in flight, trigger ignored");
            return Ok(TriggerOutcome::AlreadyRunning);
        };

        let ctx = RunContext::new(
            Arc::clone(&self.cancel),
            self.run_budget,
            self.error_sample_cap,
            params,
        );
        let store = Arc::clone(&self.store);
        let run_id = run.id;

        tokio::spawn(async move {
            if let Err(e) = execute_run(store, handler, run_id, kind, ctx).await {
                tracing::error!(kind = %kind, run_id = %run_id, error = %e, "detached run failed to finalize");
            }
        });

        Ok(TriggerOutcome::Started(run))
    }

    /// Chain all kinds in dataflow order. Continues past `partial`,
    /// stops after a `failed` run: downstream stages would hit the
    /// same infrastructure fault.
    pub async fn run_pipeline(&self, params: RunParams) -> Result<Vec<JobRun>, AppError> {
        let mut runs = Vec::new();
        for kind in JobKind::ALL {
            match self.run_now(kind, params).await? {
                TriggerOutcome::Completed(run) => {
                    let status = run.job_status();
                    runs.push(run);
                    if status == JobStatus::Failed {
                        tracing::error!(kind = %kind, "stage failed, stopping the chain");
                        break;
                    }
                }
                TriggerOutcome::AlreadyRunning => continue,
                TriggerOutcome::Started(_) => unreachable!("run_now never detaches"),
            }
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }
        }
        Ok(runs)
    }

    fn handler_for(&self, kind: JobKind) -> Result<Arc<dyn JobHandler>, AppError> {
        self.handlers
            .get(&kind)
            .cloned()
            .ok_or_else(|| AppError::Internal {
                message: format!("no handler registered for job kind {}", kind),
            })
    }
}

/// Drive one run: execute the handler, finalize the ledger row, and
/// record metrics. Handler infrastructure faults finish the run as
/// `failed` with the fault in the error summary.
async fn execute_run(
    store: Arc<dyn Store>,
    handler: Arc<dyn JobHandler>,
    run_id: uuid::Uuid,
    kind: JobKind,
    ctx: RunContext,
) -> Result<JobRun, AppError> {
    let started = Instant::now();
    tracing::info!(kind = %kind, run_id = %run_id, "run started");

    let outcome = match handler.execute(&ctx).await {
        Ok(stats) => {
            if stats.stopped_early {
                tracing::warn!(kind = %kind, run_id = %run_id, "run stopped early");
            }
            RunOutcome {
                status: stats.status(),
                items_processed: stats.processed,
                items_failed: stats.failed,
                error_summary: stats.samples,
            }
        }
        Err(JobError::Infrastructure(e)) => {
            tracing::error!(kind = %kind, run_id = %run_id, error = %e, "run aborted on infrastructure fault");
            RunOutcome {
                status: JobStatus::Failed,
                items_processed: 0,
                items_failed: 0,
                error_summary: vec![e.to_string()],
            }
        }
    };

    let duration = started.elapsed().as_secs_f64();
    let run = store.finish_run(run_id, outcome).await?;
    record_job_run(
        kind.as_str(),
        run.job_status().as_str(),
        duration,
        run.items_failed as u64,
    );
    tracing::info!(
        kind = %kind,
        run_id = %run_id,
        status = run.job_status().as_str(),
        items_processed = run.items_processed,
        items_failed = run.items_failed,
        duration_secs = duration,
        "run finished"
    );
    Ok(run)
}
