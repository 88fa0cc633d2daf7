use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue;
use serde::{Deserialize, Serialize};

pub const KIND_COMPONENT: &str = "component";
pub const KIND_CONTAINER: &str = "container";

/// A component or container with its draft/published version pointers.
///
/// `draft_version_num` is `None` while the entity is soft deleted; the pointer
/// it had before deletion is kept in `deleted_draft_version_num` so restore can
/// put it back exactly. Version rows are never removed, so
/// `latest_version_num` is also the number of versions ever created.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "publishable_entities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub learning_package_id: i32,
    #[sea_orm(unique)]
    pub entity_key: String,
    pub entity_kind: String,
    /// Block type for components, container type for containers
    pub type_name: String,
    pub local_id: String,
    pub title: String,
    pub draft_version_num: Option<i32>,
    pub published_version_num: Option<i32>,
    pub deleted_draft_version_num: Option<i32>,
    pub latest_version_num: i32,
    pub soft_deleted: bool,
    pub created_by: Option<i32>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::entity_versions::Entity")]
    Versions,
}

impl Related<super::entity_versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Versions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new() -> Self {
        Self {
            id: ActiveValue::NotSet,
            learning_package_id: ActiveValue::NotSet,
            entity_key: ActiveValue::NotSet,
            entity_kind: ActiveValue::NotSet,
            type_name: ActiveValue::NotSet,
            local_id: ActiveValue::NotSet,
            title: ActiveValue::NotSet,
            draft_version_num: ActiveValue::Set(Some(1)),
            published_version_num: ActiveValue::Set(None),
            deleted_draft_version_num: ActiveValue::Set(None),
            latest_version_num: ActiveValue::Set(1),
            soft_deleted: ActiveValue::Set(false),
            created_by: ActiveValue::NotSet,
            created_at: ActiveValue::NotSet,
            updated_at: ActiveValue::NotSet,
        }
    }
}

impl Model {
    pub fn is_container(&self) -> bool {
        self.entity_kind == KIND_CONTAINER
    }

    /// Draft differs from published, including a pending delete.
    pub fn has_unpublished_changes(&self) -> bool {
        self.draft_version_num != self.published_version_num
    }
}
