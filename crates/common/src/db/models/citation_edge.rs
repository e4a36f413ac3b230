//! Citation edge entity - resolved "cites" relationships

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A directed citation with its resolution confidence. Unique per
/// (citing, cited) pair; re-resolution replaces the whole outgoing set.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "citation_edges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub citing_paper_id: Uuid,

    pub cited_paper_id: Uuid,

    /// Similarity score at resolution time, 0-100
    pub confidence: i16,

    /// Name of the scorer that produced the match
    #[sea_orm(column_type = "Text")]
    pub method: String,

    pub resolved_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::CitingPaperId",
        to = "super::paper::Column::Id"
    )]
    CitingPaper,

    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::CitedPaperId",
        to = "super::paper::Column::Id"
    )]
    CitedPaper,
}

// Two belongs_to point at papers, so the Related impl cannot be
// derived; joins default to the citing side.
impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CitingPaper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RelationType;

    #[test]
    fn test_paper_join_uses_citing_side() {
        let def = <Entity as Related<crate::db::models::paper::Entity>>::to();
        assert!(matches!(def.rel_type, RelationType::HasOne));
    }
}
