//! SeaORM entity models
//!
//! Database entities for the PaperPulse pipeline

mod citation_edge;
mod hype_score;
mod job_run;
mod metric_sample;
mod paper;
mod source_cursor;
mod topic;
mod topic_match;

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use metric_sample::{
    Entity as MetricSampleEntity,
    Model as MetricSample,
    ActiveModel as MetricSampleActiveModel,
    Column as MetricSampleColumn,
    MetricKind,
};

pub use citation_edge::{
    Entity as CitationEdgeEntity,
    Model as CitationEdge,
    ActiveModel as CitationEdgeActiveModel,
    Column as CitationEdgeColumn,
};

pub use hype_score::{
    Entity as HypeScoreEntity,
    Model as HypeScore,
    ActiveModel as HypeScoreActiveModel,
    Column as HypeScoreColumn,
    Trend,
};

pub use job_run::{
    Entity as JobRunEntity,
    Model as JobRun,
    ActiveModel as JobRunActiveModel,
    Column as JobRunColumn,
    JobKind,
    JobStatus,
};

pub use topic::{
    Entity as TopicEntity,
    Model as Topic,
    ActiveModel as TopicActiveModel,
    Column as TopicColumn,
};

pub use topic_match::{
    Entity as TopicMatchEntity,
    Model as TopicMatch,
    ActiveModel as TopicMatchActiveModel,
    Column as TopicMatchColumn,
};

pub use source_cursor::{
    Entity as SourceCursorEntity,
    Model as SourceCursor,
    ActiveModel as SourceCursorActiveModel,
    Column as SourceCursorColumn,
};
