use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discussion_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub context_key: String,
    pub enabled: bool,
    pub provider_id: String,
    pub provider_type: String,
    pub enable_in_context: bool,
    pub enable_graded_units: bool,
    pub unit_level_visibility: bool,
    #[sea_orm(column_type = "Text", default_value = "{}")]
    pub plugin_configuration: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
