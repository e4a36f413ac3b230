//! Source cursor entity - persisted discovery pagination state

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per discovery-capable source, keyed by source name, so a
/// discovery run resumes where the previous one stopped.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "source_cursors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub source: String,

    #[sea_orm(column_type = "Text")]
    pub cursor: String,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
