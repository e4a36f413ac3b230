//! Metric sample entity - the append-only time series

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Metric kind enum
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Stars,
    Citations,
}

impl MetricKind {
    pub const ALL: [MetricKind; 2] = [MetricKind::Stars, MetricKind::Citations];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Stars => "stars",
            MetricKind::Citations => "citations",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stars" => Some(MetricKind::Stars),
            "citations" => Some(MetricKind::Citations),
            _ => None,
        }
    }
}

impl From<String> for MetricKind {
    fn from(s: String) -> Self {
        MetricKind::parse(&s).unwrap_or(MetricKind::Stars)
    }
}

impl From<MetricKind> for String {
    fn from(kind: MetricKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measurement. Unique per (paper, kind, sample_date); writes to an
/// existing key are last-write-wins.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "metric_samples")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub paper_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub kind: String,

    pub sample_date: Date,

    /// Non-negative counter value as reported by the source
    pub value: i64,

    pub recorded_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the metric kind as an enum
    pub fn metric_kind(&self) -> MetricKind {
        MetricKind::from(self.kind.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::PaperId",
        to = "super::paper::Column::Id"
    )]
    Paper,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
