use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Asset bytes, deduplicated by SHA-256 within a learning package. Media
/// types belong to the path an asset is stored under, not to the bytes.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "asset_contents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub learning_package_id: i32,
    pub content_hash: String,
    pub size: i64,
    #[serde(skip)]
    #[sea_orm(column_type = "Binary(BlobSize::Blob(None))")]
    pub data: Vec<u8>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
