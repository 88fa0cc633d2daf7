use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_libraries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub org: String,
    pub slug: String,
    /// complex, problem or video
    pub library_type: String,
    pub learning_package_id: i32,
    pub allow_public_read: bool,
    pub allow_public_learning: bool,
    pub allow_lti: bool,
    pub license: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
    pub deleted_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::learning_packages::Entity",
        from = "Column::LearningPackageId",
        to = "super::learning_packages::Column::Id"
    )]
    LearningPackage,
}

impl Related<super::learning_packages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LearningPackage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new() -> Self {
        Self {
            id: ActiveValue::NotSet,
            org: ActiveValue::NotSet,
            slug: ActiveValue::NotSet,
            library_type: ActiveValue::NotSet,
            learning_package_id: ActiveValue::NotSet,
            allow_public_read: ActiveValue::Set(false),
            allow_public_learning: ActiveValue::Set(false),
            allow_lti: ActiveValue::Set(false),
            license: ActiveValue::Set(String::new()),
            created_at: ActiveValue::NotSet,
            updated_at: ActiveValue::NotSet,
            deleted_at: ActiveValue::Set(None),
        }
    }
}
