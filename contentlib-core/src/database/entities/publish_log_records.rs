use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One published pointer move. `new_version_num` is `None` when a pending
/// delete was published.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "publish_log_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub publish_log_id: i32,
    pub entity_id: i32,
    pub old_version_num: Option<i32>,
    pub new_version_num: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
