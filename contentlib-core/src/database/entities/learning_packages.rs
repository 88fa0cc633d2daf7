use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Storage unit owned by exactly one library. Holds the title and description
/// shown for the library; every entity, asset blob and collection points here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "learning_packages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Library key text
    #[sea_orm(unique)]
    pub key: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
    pub deleted_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
