use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A grant of admin, author or read access to one user or one group.
/// Exactly one of `user_id` and `group_id` is set.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "library_permissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub library_id: i32,
    pub user_id: Option<i32>,
    pub group_id: Option<i32>,
    pub access_level: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
