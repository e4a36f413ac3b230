//! Read and trigger facade over the store and the orchestrator
//!
//! The seam an HTTP layer or a richer CLI would sit on. Lookups verify
//! the paper exists so callers can tell "no such paper" from "no data
//! yet for this paper".

use crate::graph::{CitationGraph, GraphView, TraversalDirection, MAX_TRAVERSAL_DEPTH};
use crate::jobs::{Orchestrator, RunParams, TriggerOutcome};
use chrono::{Duration, Utc};
use paperpulse_common::db::models::{HypeScore, JobKind, JobRun, MetricKind, Paper};
use paperpulse_common::errors::{AppError, Result};
use paperpulse_common::store::{MetricPoint, Store};
use std::sync::Arc;
use uuid::Uuid;

pub struct PipelineApi {
    store: Arc<dyn Store>,
    orchestrator: Arc<Orchestrator>,
}

impl PipelineApi {
    pub fn new(store: Arc<dyn Store>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    pub async fn paper(&self, paper_id: Uuid) -> Result<Paper> {
        self.store
            .paper_by_id(paper_id)
            .await?
            .ok_or_else(|| AppError::PaperNotFound {
                id: paper_id.to_string(),
            })
    }

    /// Latest score with its component breakdown
    pub async fn latest_score(&self, paper_id: Uuid) -> Result<HypeScore> {
        self.paper(paper_id).await?;
        self.store
            .latest_score(paper_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "hype_score".to_string(),
                id: paper_id.to_string(),
            })
    }

    /// Metric points for the trailing `days`, oldest first
    pub async fn metric_history(
        &self,
        paper_id: Uuid,
        kind: MetricKind,
        days: u32,
    ) -> Result<Vec<MetricPoint>> {
        self.paper(paper_id).await?;
        let to = Utc::now().date_naive();
        let from = to - Duration::days(days as i64);
        self.store.sample_range(paper_id, kind, from, to).await
    }

    /// Citation neighborhood of a paper. Depth is capped at
    /// [`MAX_TRAVERSAL_DEPTH`] regardless of what the caller asks for.
    pub async fn citation_graph(
        &self,
        paper_id: Uuid,
        depth: usize,
        direction: TraversalDirection,
    ) -> Result<GraphView> {
        self.paper(paper_id).await?;

        let mut graph = CitationGraph::new();
        for paper in self.store.list_papers().await? {
            graph.add_paper(paper.id, &paper.title);
        }
        for edge in self.store.all_edges().await? {
            graph.add_edge(edge.citing_paper_id, edge.cited_paper_id, edge.confidence);
        }

        Ok(graph.traverse(paper_id, depth.min(MAX_TRAVERSAL_DEPTH), direction))
    }

    /// Start a job detached; returns `AlreadyRunning` instead of queueing
    pub async fn trigger_job(&self, kind: JobKind, params: RunParams) -> Result<TriggerOutcome> {
        self.orchestrator.spawn(kind, params).await
    }

    pub async fn job_status(&self, run_id: Uuid) -> Result<JobRun> {
        self.store
            .run_by_id(run_id)
            .await?
            .ok_or_else(|| AppError::RunNotFound {
                id: run_id.to_string(),
            })
    }

    /// Most recently started run of a kind, if any
    pub async fn latest_run(&self, kind: JobKind) -> Result<Option<JobRun>> {
        self.store.latest_run(kind).await
    }

    /// Downsample samples older than `keep_days` to one per ISO week.
    /// Returns the number of rows removed.
    pub async fn compact_metrics(&self, keep_days: u32) -> Result<u64> {
        let cutoff = Utc::now().date_naive() - Duration::days(keep_days as i64);
        let removed = self.store.compact_samples(cutoff).await?;
        tracing::info!(keep_days, removed, "metric samples compacted");
        Ok(removed)
    }
}
