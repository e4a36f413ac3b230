//! Paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Immutable source identity, e.g. an arXiv id ("2401.12345")
    #[sea_orm(column_type = "Text", unique)]
    pub source_id: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Author names as a JSON array
    #[sea_orm(column_type = "JsonBinary")]
    pub authors: serde_json::Value,

    #[sea_orm(column_type = "Text")]
    pub abstract_text: String,

    pub published_at: Option<DateTimeWithTimeZone>,

    /// Code-hosting link discovered in the paper metadata, if any
    #[sea_orm(column_type = "Text", nullable)]
    pub repo_url: Option<String>,

    /// Raw reference-list text, filled when a source provides it
    #[sea_orm(column_type = "Text", nullable)]
    pub references_raw: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Author names as strings
    pub fn author_list(&self) -> Vec<String> {
        serde_json::from_value(self.authors.clone()).unwrap_or_default()
    }

    /// Publication year, when the date is known
    pub fn year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.published_at.map(|d| d.year())
    }

    /// "owner/repo" extracted from the repo URL, the locator GitHub polls
    pub fn repo_full_name(&self) -> Option<String> {
        let url = self.repo_url.as_deref()?;
        let rest = url
            .strip_prefix("https://github.com/")
            .or_else(|| url.strip_prefix("http://github.com/"))?;
        let mut parts = rest.trim_end_matches('/').splitn(3, '/');
        let owner = parts.next()?;
        let repo = parts.next()?;
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(format!("{}/{}", owner, repo.trim_end_matches(".git")))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::metric_sample::Entity")]
    MetricSamples,

    #[sea_orm(has_many = "super::citation_edge::Entity")]
    OutgoingCitations,
}

impl Related<super::metric_sample::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MetricSamples.def()
    }
}

impl Related<super::citation_edge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OutgoingCitations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
