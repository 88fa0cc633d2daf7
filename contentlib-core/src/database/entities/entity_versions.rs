use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Immutable snapshot of an entity. Components carry OLX and a field map;
/// containers carry only a title, their children live in `container_children`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity_versions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub entity_id: i32,
    pub version_num: i32,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub olx: Option<String>,
    #[sea_orm(column_type = "Text", default_value = "{}")]
    pub fields: String,
    pub created_by: Option<i32>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::publishable_entities::Entity",
        from = "Column::EntityId",
        to = "super::publishable_entities::Column::Id"
    )]
    PublishableEntity,
}

impl Related<super::publishable_entities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PublishableEntity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
