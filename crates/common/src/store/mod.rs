//! Store abstraction for the pipeline
//!
//! All persistent state (papers, metric samples, citation edges, scores,
//! the job-run ledger, topics, source cursors) is reached through the
//! [`Store`] trait so the pipeline runs identically against Postgres and
//! the in-memory backend used by tests and local trials.

mod memory;
mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

use crate::config::AppConfig;
use crate::db::models::{CitationEdge, HypeScore, JobKind, JobRun, JobStatus, MetricKind, Paper, Topic, Trend};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Fields of a paper as discovered from a source, before it has an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaper {
    pub source_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub repo_url: Option<String>,
    pub references_raw: Option<String>,
}

/// One (date, value) point of a metric series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub value: i64,
}

/// A resolved citation about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEdge {
    pub cited_paper_id: Uuid,
    pub confidence: i16,
    pub method: String,
}

/// A freshly computed score about to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewScore {
    pub paper_id: Uuid,
    pub score: f64,
    pub star_growth_7d: f64,
    pub citation_growth_30d: f64,
    pub absolute_norm: f64,
    pub recency_bonus: f64,
    pub trend: Trend,
}

/// Terminal accounting for a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: JobStatus,
    pub items_processed: i32,
    pub items_failed: i32,
    pub error_summary: Vec<String>,
}

/// Persistent state operations used by the pipeline
#[async_trait]
pub trait Store: Send + Sync {
    /// Health check against the backing storage
    async fn ping(&self) -> Result<()>;

    // ========================================================================
    // Papers
    // ========================================================================

    /// Idempotent upsert keyed by source id: descriptive fields are
    /// refreshed, identity and creation time are preserved.
    async fn upsert_paper(&self, new: NewPaper) -> Result<Paper>;

    async fn paper_by_id(&self, id: Uuid) -> Result<Option<Paper>>;

    async fn paper_by_source_id(&self, source_id: &str) -> Result<Option<Paper>>;

    /// All papers, oldest first
    async fn list_papers(&self) -> Result<Vec<Paper>>;

    // ========================================================================
    // Metric samples
    // ========================================================================

    /// Append one measurement; a re-write of the same (paper, kind, date)
    /// key is last-write-wins.
    async fn append_sample(
        &self,
        paper_id: Uuid,
        kind: MetricKind,
        date: NaiveDate,
        value: i64,
    ) -> Result<()>;

    async fn latest_sample(&self, paper_id: Uuid, kind: MetricKind) -> Result<Option<MetricPoint>>;

    /// Points within [from, to], ordered by date ascending
    async fn sample_range(
        &self,
        paper_id: Uuid,
        kind: MetricKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MetricPoint>>;

    /// Most recent value with sample date <= date
    async fn value_as_of(
        &self,
        paper_id: Uuid,
        kind: MetricKind,
        date: NaiveDate,
    ) -> Result<Option<i64>>;

    /// Downsample rows older than the cutoff to the last sample per
    /// (paper, kind, ISO week). Returns the number of rows deleted.
    async fn compact_samples(&self, older_than: NaiveDate) -> Result<u64>;

    // ========================================================================
    // Citation edges
    // ========================================================================

    /// Replace the citing paper's outgoing edges wholesale
    async fn replace_outgoing_edges(&self, citing_paper_id: Uuid, edges: Vec<NewEdge>) -> Result<()>;

    async fn edges_from(&self, paper_id: Uuid) -> Result<Vec<CitationEdge>>;

    async fn edges_to(&self, paper_id: Uuid) -> Result<Vec<CitationEdge>>;

    async fn all_edges(&self) -> Result<Vec<CitationEdge>>;

    // ========================================================================
    // Hype scores
    // ========================================================================

    /// Upsert the latest score for a paper
    async fn put_score(&self, score: NewScore) -> Result<()>;

    async fn latest_score(&self, paper_id: Uuid) -> Result<Option<HypeScore>>;

    // ========================================================================
    // Job runs
    // ========================================================================

    /// Start a run of the given kind, unless one is already running.
    /// The guard is a conditional insert, so it holds across processes.
    /// Returns None when a running row exists.
    async fn begin_run(&self, kind: JobKind) -> Result<Option<JobRun>>;

    /// Set the terminal state and counters for a run
    async fn finish_run(&self, run_id: Uuid, outcome: RunOutcome) -> Result<JobRun>;

    async fn run_by_id(&self, run_id: Uuid) -> Result<Option<JobRun>>;

    /// Most recently started run of a kind
    async fn latest_run(&self, kind: JobKind) -> Result<Option<JobRun>>;

    // ========================================================================
    // Topics
    // ========================================================================

    async fn list_topics(&self) -> Result<Vec<Topic>>;

    async fn topic_by_slug(&self, slug: &str) -> Result<Option<Topic>>;

    /// Upsert a relevance score for a (topic, paper) pair
    async fn upsert_topic_match(&self, topic_id: Uuid, paper_id: Uuid, score: f32) -> Result<()>;

    /// Ids of papers matched to a topic
    async fn papers_for_topic(&self, topic_id: Uuid) -> Result<Vec<Uuid>>;

    // ========================================================================
    // Source cursors
    // ========================================================================

    async fn source_cursor(&self, source: &str) -> Result<Option<String>>;

    async fn save_source_cursor(&self, source: &str, cursor: &str) -> Result<()>;
}

/// Create a store based on configuration
pub async fn create_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    match config.database.backend.as_str() {
        "postgres" => {
            let store = PgStore::connect(&config.database).await?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemStore::new())),
        other => {
            tracing::warn!(backend = other, "Unknown store backend, using memory");
            Ok(Arc::new(MemStore::new()))
        }
    }
}
