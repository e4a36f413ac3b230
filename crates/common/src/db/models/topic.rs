//! Topic entity - watched research areas

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "topics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Keyword set as a JSON array
    #[sea_orm(column_type = "JsonBinary")]
    pub keywords: serde_json::Value,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Keywords as strings
    pub fn keyword_list(&self) -> Vec<String> {
        serde_json::from_value(self.keywords.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::topic_match::Entity")]
    Matches,
}

impl Related<super::topic_match::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Matches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
