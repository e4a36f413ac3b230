//! Hype score entity - latest computation per paper

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Trend label derived from the 7-day star growth
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Stable,
    Declining,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        }
    }
}

impl From<String> for Trend {
    fn from(s: String) -> Self {
        match s.as_str() {
            "rising" => Trend::Rising,
            "declining" => Trend::Declining,
            _ => Trend::Stable,
        }
    }
}

impl From<Trend> for String {
    fn from(trend: Trend) -> Self {
        trend.as_str().to_string()
    }
}

/// The most recent score and its component breakdown. One row per paper,
/// overwritten wholesale by each scoring run.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hype_scores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub paper_id: Uuid,

    /// Weighted composite, clamped to 0-100
    pub score: f64,

    pub star_growth_7d: f64,

    pub citation_growth_30d: f64,

    pub absolute_norm: f64,

    pub recency_bonus: f64,

    #[sea_orm(column_type = "Text")]
    pub trend: String,

    pub computed_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the trend as an enum
    pub fn trend_label(&self) -> Trend {
        Trend::from(self.trend.clone())
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
