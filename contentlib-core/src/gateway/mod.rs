//! The single entry point for library mutations and queries.
//!
//! Every write follows the same sequence: resolve the library, check the
//! permission, take the library's write lock, run the change inside one
//! transaction, commit, then publish the collected events. Reads check
//! permissions and never take the lock.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LibraryConfig;
use crate::database::entities::{
    collections, content_libraries, learning_packages, publishable_entities,
};
use crate::errors::{LibraryError, LibraryResult};
use crate::events::{EventBus, LibraryEvent};
use crate::keys::{CollectionKey, ContainerKey, ContainerType, LibraryKey, OpaqueKey, UsageKey};
use crate::services::lifecycle::PublishState;
use crate::services::{entity_store, Action, Actor, PermissionService, TopicService, UserService};
use crate::utils::LibraryLocks;

mod asset_operations;
mod collection_operations;
mod component_operations;
mod container_operations;
mod library_operations;
mod publish_operations;
mod team_operations;

/// Shared gateway exposing the library services to the REST layer and tests.
#[derive(Clone)]
pub struct LibraryGateway {
    db: DatabaseConnection,
    config: Arc<LibraryConfig>,
    events: EventBus,
    locks: LibraryLocks,
    permissions: Arc<PermissionService>,
    users: Arc<UserService>,
    topics: Arc<TopicService>,
}

impl LibraryGateway {
    pub fn new(db: DatabaseConnection, config: LibraryConfig) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        let permissions = Arc::new(PermissionService::new(db.clone(), &config));
        let users = Arc::new(UserService::new(db.clone()));
        let topics = Arc::new(TopicService::new(db.clone(), &config));

        Self {
            db,
            config: Arc::new(config),
            events,
            locks: LibraryLocks::new(),
            permissions,
            users,
            topics,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn permissions(&self) -> &Arc<PermissionService> {
        &self.permissions
    }

    pub fn users(&self) -> &Arc<UserService> {
        &self.users
    }

    pub fn topics(&self) -> &Arc<TopicService> {
        &self.topics
    }

    // ----- Shared helpers --------------------------------------------------

    pub(crate) async fn find_library<C: ConnectionTrait>(
        conn: &C,
        key: &LibraryKey,
    ) -> LibraryResult<Option<LibraryRecord>> {
        let found = content_libraries::Entity::find()
            .filter(content_libraries::Column::Org.eq(key.org()))
            .filter(content_libraries::Column::Slug.eq(key.slug()))
            .find_also_related(learning_packages::Entity)
            .one(conn)
            .await?;
        match found {
            Some((library, Some(package))) => Ok(Some(LibraryRecord {
                key: key.clone(),
                library,
                package,
            })),
            Some((library, None)) => Err(LibraryError::Internal(format!(
                "library {} has no learning package {}",
                key, library.learning_package_id
            ))),
            None => Ok(None),
        }
    }

    /// Resolve a library and check `action` on it. Deleted libraries count as
    /// missing unless `include_deleted` is set.
    pub(crate) async fn authorize(
        &self,
        actor: &Actor,
        action: Action,
        key: &LibraryKey,
        include_deleted: bool,
    ) -> LibraryResult<LibraryRecord> {
        let record = Self::find_library(&self.db, key)
            .await?
            .filter(|record| include_deleted || record.library.deleted_at.is_none())
            .ok_or_else(|| LibraryError::not_found("library", key))?;
        self.permissions
            .ensure(actor, action, &record.library, &key.to_string())
            .await?;
        Ok(record)
    }

    /// Events telling each container whose draft includes `entity_id` that a
    /// child changed.
    pub(crate) async fn parent_events<C: ConnectionTrait>(
        conn: &C,
        entity_id: i32,
        published: bool,
    ) -> LibraryResult<Vec<LibraryEvent>> {
        let mut events = Vec::new();
        for parent in entity_store::parent_containers(conn, entity_id).await? {
            if let OpaqueKey::Container(container_key) = entity_store::parse_entity_key(&parent)? {
                events.push(if published {
                    LibraryEvent::ContainerPublished { container_key }
                } else {
                    LibraryEvent::ContainerUpdated {
                        container_key,
                        background: true,
                    }
                });
            }
        }
        Ok(events)
    }

    pub(crate) async fn collection_keys_for<C: ConnectionTrait>(
        conn: &C,
        library_key: &LibraryKey,
        entity_id: i32,
    ) -> LibraryResult<Vec<CollectionKey>> {
        crate::services::collection_service::collections_for_entity(conn, entity_id)
            .await?
            .iter()
            .map(|collection| collection_key_of(library_key, collection))
            .collect()
    }
}

pub(crate) fn collection_key_of(
    library_key: &LibraryKey,
    collection: &collections::Model,
) -> LibraryResult<CollectionKey> {
    Ok(library_key.collection_key(&collection.key)?)
}

/// A library row with its learning package.
#[derive(Debug, Clone)]
pub(crate) struct LibraryRecord {
    pub key: LibraryKey,
    pub library: content_libraries::Model,
    pub package: learning_packages::Model,
}

// ----- Public types -----

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryType {
    #[default]
    Complex,
    Problem,
    Video,
}

impl LibraryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryType::Complex => "complex",
            LibraryType::Problem => "problem",
            LibraryType::Video => "video",
        }
    }

    /// Non-complex libraries accept only their own block type.
    pub fn allows_block_type(&self, block_type: &str) -> bool {
        match self {
            LibraryType::Complex => true,
            other => other.as_str() == block_type,
        }
    }
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LibraryType {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complex" => Ok(LibraryType::Complex),
            "problem" => Ok(LibraryType::Problem),
            "video" => Ok(LibraryType::Video),
            _ => Err(LibraryError::Validation(format!("Invalid library type: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLibrary {
    pub org: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub library_type: LibraryType,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub allow_public_learning: bool,
    #[serde(default)]
    pub allow_public_read: bool,
}

impl NewLibrary {
    pub fn new(org: impl Into<String>, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            slug: slug.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub library_type: Option<LibraryType>,
    pub license: Option<String>,
    pub allow_public_learning: Option<bool>,
    pub allow_public_read: Option<bool>,
    pub allow_lti: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryFilter {
    pub org: Option<String>,
    #[serde(rename = "type")]
    pub library_type: Option<LibraryType>,
    pub text_search: Option<String>,
    /// `key` (default), `title` or `created`, `-` prefix for descending
    pub order: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryMetadata {
    pub key: LibraryKey,
    pub org: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub library_type: LibraryType,
    pub license: String,
    pub allow_public_learning: bool,
    pub allow_public_read: bool,
    pub allow_lti: bool,
    pub num_blocks: u64,
    pub last_published: Option<DateTime<Utc>>,
    pub published_by: Option<String>,
    pub has_unpublished_changes: bool,
    pub has_unpublished_deletes: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentFilter {
    pub text_search: Option<String>,
    #[serde(default)]
    pub block_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentMetadata {
    pub usage_key: UsageKey,
    pub block_type: String,
    pub display_name: String,
    pub state: PublishState,
    pub draft_version_num: Option<i32>,
    pub published_version_num: Option<i32>,
    pub has_unpublished_changes: bool,
    pub created_by: Option<i32>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<CollectionKey>>,
}

impl ComponentMetadata {
    pub(crate) fn from_entity(
        usage_key: UsageKey,
        entity: &publishable_entities::Model,
        collections: Option<Vec<CollectionKey>>,
    ) -> Self {
        Self {
            block_type: usage_key.block_type().to_string(),
            usage_key,
            display_name: entity.title.clone(),
            state: PublishState::of(entity),
            draft_version_num: entity.draft_version_num,
            published_version_num: entity.published_version_num,
            has_unpublished_changes: entity.has_unpublished_changes(),
            created_by: entity.created_by,
            created: entity.created_at,
            modified: entity.updated_at,
            collections,
        }
    }
}

/// One version of a component's payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentVersionView {
    pub usage_key: UsageKey,
    pub version_num: i32,
    pub display_name: String,
    pub olx: String,
    pub fields: Value,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerMetadata {
    pub container_key: ContainerKey,
    pub container_type: ContainerType,
    pub display_name: String,
    pub state: PublishState,
    pub draft_version_num: Option<i32>,
    pub published_version_num: Option<i32>,
    pub has_unpublished_changes: bool,
    pub created_by: Option<i32>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<CollectionKey>>,
}

impl ContainerMetadata {
    pub(crate) fn from_entity(
        container_key: ContainerKey,
        entity: &publishable_entities::Model,
        collections: Option<Vec<CollectionKey>>,
    ) -> Self {
        Self {
            container_type: container_key.container_type(),
            container_key,
            display_name: entity.title.clone(),
            state: PublishState::of(entity),
            draft_version_num: entity.draft_version_num,
            published_version_num: entity.published_version_num,
            has_unpublished_changes: entity.has_unpublished_changes(),
            created_by: entity.created_by,
            created: entity.created_at,
            modified: entity.updated_at,
            collections,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerChild {
    pub key: OpaqueKey,
    pub display_name: String,
    /// Version shown in the requested view
    pub version_num: i32,
    pub state: PublishState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetInfo {
    pub path: String,
    pub size: i64,
    pub content_hash: String,
    pub media_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionMetadata {
    pub key: CollectionKey,
    pub title: String,
    pub description: String,
    pub enabled: bool,
    pub created_by: Option<i32>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_keys: Option<Vec<OpaqueKey>>,
}

impl CollectionMetadata {
    pub(crate) fn from_model(
        key: CollectionKey,
        model: &collections::Model,
        entity_keys: Option<Vec<OpaqueKey>>,
    ) -> Self {
        Self {
            key,
            title: model.title.clone(),
            description: model.description.clone(),
            enabled: model.enabled,
            created_by: model.created_by,
            created: model.created_at,
            modified: model.updated_at,
            entity_keys,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishOutcome {
    /// Entities whose published pointer moved, children before parents
    pub published: Vec<OpaqueKey>,
    pub log_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamGrant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub access_level: crate::services::AccessLevel,
}
