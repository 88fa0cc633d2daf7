use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue;
use serde::{Deserialize, Serialize};

/// How one piece of a learning context is exposed to a discussion provider.
/// General (course-wide) topics have no `usage_key`. The row carries no
/// modification timestamp so re-running a projection leaves it untouched.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "topic_links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub context_key: String,
    pub usage_key: Option<String>,
    pub provider_id: String,
    pub external_id: String,
    pub title: String,
    pub ordering: i32,
    pub enabled_in_context: bool,
    /// Breadcrumb snapshot (section, subsection, unit names) as JSON
    #[sea_orm(column_type = "Text", default_value = "{}")]
    pub context: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new() -> Self {
        Self {
            id: ActiveValue::NotSet,
            context_key: ActiveValue::NotSet,
            usage_key: ActiveValue::Set(None),
            provider_id: ActiveValue::NotSet,
            external_id: ActiveValue::NotSet,
            title: ActiveValue::NotSet,
            ordering: ActiveValue::NotSet,
            enabled_in_context: ActiveValue::Set(true),
            context: ActiveValue::Set("{}".to_string()),
            created_at: ActiveValue::Set(chrono::Utc::now()),
        }
    }
}
