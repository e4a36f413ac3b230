//! Job run entity - the orchestration ledger

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pipeline job kinds, in dataflow order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Discovery,
    MetricRefresh,
    CitationResolution,
    Scoring,
}

impl JobKind {
    /// All kinds in the order the full pipeline chains them
    pub const ALL: [JobKind; 4] = [
        JobKind::Discovery,
        JobKind::MetricRefresh,
        JobKind::CitationResolution,
        JobKind::Scoring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Discovery => "discovery",
            JobKind::MetricRefresh => "metric-refresh",
            JobKind::CitationResolution => "citation-resolution",
            JobKind::Scoring => "scoring",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "discovery" => Some(JobKind::Discovery),
            "metric-refresh" => Some(JobKind::MetricRefresh),
            "citation-resolution" => Some(JobKind::CitationResolution),
            "scoring" => Some(JobKind::Scoring),
            _ => None,
        }
    }
}

impl From<String> for JobKind {
    fn from(s: String) -> Self {
        JobKind::parse(&s).unwrap_or(JobKind::Discovery)
    }
}

impl From<JobKind> for String {
    fn from(kind: JobKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status enum
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Partial,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Partial => "partial",
        }
    }

    /// Terminal states are never left once entered
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Partial)
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            "partial" => JobStatus::Partial,
            _ => JobStatus::Pending,
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "job_runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub kind: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub started_at: DateTimeWithTimeZone,

    pub completed_at: Option<DateTimeWithTimeZone>,

    pub items_processed: i32,

    pub items_failed: i32,

    /// Capped list of sample error messages as a JSON array
    #[sea_orm(column_type = "JsonBinary")]
    pub error_summary: serde_json::Value,
}

impl Model {
    /// Get the job kind as an enum
    pub fn job_kind(&self) -> JobKind {
        JobKind::from(self.kind.clone())
    }

    /// Get the job status as an enum
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from(self.status.clone())
    }

    /// Check if the run is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.job_status().is_terminal()
    }

    /// Sample error messages recorded for this run
    pub fn error_samples(&self) -> Vec<String> {
        serde_json::from_value(self.error_summary.clone()).unwrap_or_default()
    }

    /// Wall-clock duration, once completed
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done.signed_duration_since(self.started_at))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
