use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "container_children")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The container version this row belongs to
    pub version_id: i32,
    pub position: i32,
    pub child_entity_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
