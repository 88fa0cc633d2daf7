//! Draft/published state machine.
//!
//! An entity's state is fully determined by its pointers:
//!
//! | draft | published | soft deleted | state |
//! |-------|-----------|--------------|-------|
//! | `Some(n)` | `None` | no | draft only |
//! | `Some(n)` | `Some(n)` | no | published, clean |
//! | `Some(n)` | `Some(m)`, `m < n` | no | published, dirty |
//! | `None` | any | yes | tombstoned |

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::entities::{publish_log_records, publish_logs, publishable_entities};
use crate::errors::LibraryResult;
use crate::services::entity_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    DraftOnly,
    PublishedClean,
    PublishedDirty,
    Tombstoned,
}

impl PublishState {
    pub fn of(entity: &publishable_entities::Model) -> Self {
        if entity.soft_deleted {
            return PublishState::Tombstoned;
        }
        match entity.published_version_num {
            None => PublishState::DraftOnly,
            Some(published) if entity.draft_version_num == Some(published) => {
                PublishState::PublishedClean
            }
            Some(_) => PublishState::PublishedDirty,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishState::DraftOnly => "draft_only",
            PublishState::PublishedClean => "published_clean",
            PublishState::PublishedDirty => "published_dirty",
            PublishState::Tombstoned => "tombstoned",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PublishResult {
    /// Entities whose published pointer moved, in publish order
    pub published: Vec<publishable_entities::Model>,
    pub log: Option<publish_logs::Model>,
}

/// Move the published pointer of every dirty entity in `entities` to its
/// draft, in the given order. Clean entities are skipped, and when nothing
/// moves no publish log is written.
pub async fn publish_entities<C: ConnectionTrait>(
    conn: &C,
    learning_package_id: i32,
    entities: Vec<publishable_entities::Model>,
    message: &str,
    published_by: Option<i32>,
) -> LibraryResult<PublishResult> {
    let dirty: Vec<publishable_entities::Model> = entities
        .into_iter()
        .filter(|entity| entity.has_unpublished_changes())
        .collect();
    if dirty.is_empty() {
        return Ok(PublishResult::default());
    }

    let log = publish_logs::ActiveModel {
        learning_package_id: Set(learning_package_id),
        message: Set(message.to_string()),
        published_by: Set(published_by),
        published_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let mut published = Vec::with_capacity(dirty.len());
    for entity in dirty {
        publish_log_records::ActiveModel {
            publish_log_id: Set(log.id),
            entity_id: Set(entity.id),
            old_version_num: Set(entity.published_version_num),
            new_version_num: Set(entity.draft_version_num),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        let draft = entity.draft_version_num;
        let mut active: publishable_entities::ActiveModel = entity.into();
        active.published_version_num = Set(draft);
        published.push(active.update(conn).await?);
    }

    info!(
        "Publish log {} moved {} entities in package {}",
        log.id,
        published.len(),
        learning_package_id
    );
    Ok(PublishResult {
        published,
        log: Some(log),
    })
}

/// Tombstone an entity, remembering its draft pointer for [`restore`].
/// Deleting an already deleted entity changes nothing.
pub async fn soft_delete<C: ConnectionTrait>(
    conn: &C,
    entity: publishable_entities::Model,
) -> LibraryResult<publishable_entities::Model> {
    if entity.soft_deleted {
        return Ok(entity);
    }
    let draft = entity.draft_version_num;
    let mut active: publishable_entities::ActiveModel = entity.into();
    active.deleted_draft_version_num = Set(draft);
    active.draft_version_num = Set(None);
    active.soft_deleted = Set(true);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Undo [`soft_delete`]. Entities tombstoned by a revert have no remembered
/// pointer and come back at their latest version.
pub async fn restore<C: ConnectionTrait>(
    conn: &C,
    entity: publishable_entities::Model,
) -> LibraryResult<publishable_entities::Model> {
    if !entity.soft_deleted {
        return Ok(entity);
    }
    let draft = entity
        .deleted_draft_version_num
        .unwrap_or(entity.latest_version_num);
    let mut active: publishable_entities::ActiveModel = entity.into();
    active.draft_version_num = Set(Some(draft));
    active.deleted_draft_version_num = Set(None);
    active.soft_deleted = Set(false);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Discard unpublished changes of one entity. Published entities go back to
/// their published version; never-published entities are tombstoned.
/// Returns `None` when there was nothing to discard.
pub async fn revert_entity<C: ConnectionTrait>(
    conn: &C,
    entity: publishable_entities::Model,
) -> LibraryResult<Option<publishable_entities::Model>> {
    if !entity.has_unpublished_changes() {
        return Ok(None);
    }
    let published = match entity.published_version_num {
        Some(version_num) => Some(entity_store::load_version(conn, entity.id, version_num).await?),
        None => None,
    };
    let mut active: publishable_entities::ActiveModel = entity.into();
    match published {
        Some(version) => {
            active.draft_version_num = Set(Some(version.version_num));
            active.title = Set(version.title);
            active.soft_deleted = Set(false);
        }
        None => {
            active.draft_version_num = Set(None);
            active.soft_deleted = Set(true);
        }
    }
    active.deleted_draft_version_num = Set(None);
    active.updated_at = Set(Utc::now());
    Ok(Some(active.update(conn).await?))
}

/// `root` and every entity reachable through draft child lists, children
/// before parents. Each entity appears once.
pub async fn container_closure<C: ConnectionTrait>(
    conn: &C,
    root: publishable_entities::Model,
) -> LibraryResult<Vec<publishable_entities::Model>> {
    let mut order = Vec::new();
    let mut visited: HashSet<i32> = HashSet::new();
    let mut stack = vec![(root, false)];

    while let Some((entity, expanded)) = stack.pop() {
        if expanded {
            order.push(entity);
            continue;
        }
        if !visited.insert(entity.id) {
            continue;
        }

        let children = match (entity.is_container(), entity.draft_version_num) {
            (true, Some(version_num)) => {
                let version = entity_store::load_version(conn, entity.id, version_num).await?;
                entity_store::children_ids(conn, version.id).await?
            }
            _ => Vec::new(),
        };
        let by_id = entity_store::entities_by_ids(conn, &children).await?;

        stack.push((entity, true));
        for child_id in children.iter().rev() {
            if let Some(child) = by_id.get(child_id) {
                if !visited.contains(child_id) {
                    stack.push((child.clone(), false));
                }
            }
        }
    }
    Ok(order)
}

/// Most recent publish log of each package in `learning_package_ids`.
/// Packages that were never published are absent from the map.
pub async fn latest_publish_logs<C: ConnectionTrait>(
    conn: &C,
    learning_package_ids: &[i32],
) -> LibraryResult<HashMap<i32, publish_logs::Model>> {
    if learning_package_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let latest: Vec<(i32, i32)> = publish_logs::Entity::find()
        .select_only()
        .column(publish_logs::Column::LearningPackageId)
        .column_as(publish_logs::Column::Id.max(), "latest_id")
        .filter(publish_logs::Column::LearningPackageId.is_in(learning_package_ids.iter().copied()))
        .group_by(publish_logs::Column::LearningPackageId)
        .into_tuple()
        .all(conn)
        .await?;
    if latest.is_empty() {
        return Ok(HashMap::new());
    }

    let logs = publish_logs::Entity::find()
        .filter(publish_logs::Column::Id.is_in(latest.iter().map(|(_, id)| *id)))
        .all(conn)
        .await?;
    Ok(logs
        .into_iter()
        .map(|log| (log.learning_package_id, log))
        .collect())
}

pub async fn publish_log_records<C: ConnectionTrait>(
    conn: &C,
    publish_log_id: i32,
) -> LibraryResult<Vec<publish_log_records::Model>> {
    Ok(publish_log_records::Entity::find()
        .filter(publish_log_records::Column::PublishLogId.eq(publish_log_id))
        .order_by_asc(publish_log_records::Column::Id)
        .all(conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::publishable_entities::KIND_COMPONENT;
    use crate::database::test_utils::setup_test_db;
    use crate::keys::OpaqueKey;
    use crate::services::entity_store::{create_entity, NewEntity, VersionContent};
    use serde_json::json;

    async fn component(
        db: &sea_orm::DatabaseConnection,
        local_id: &str,
    ) -> publishable_entities::Model {
        let key: OpaqueKey = format!("lb:Axim:Demo:problem:{}", local_id).parse().unwrap();
        create_entity(
            db,
            NewEntity {
                learning_package_id: 1,
                key: &key,
                kind: KIND_COMPONENT,
                type_name: "problem",
                local_id,
                created_by: None,
            },
            &VersionContent::component(local_id, "<problem/>", json!({})),
        )
        .await
        .unwrap()
        .0
    }

    #[tokio::test]
    async fn test_publish_is_idempotent() {
        let db = setup_test_db().await;
        let entity = component(&db, "q1").await;
        assert_eq!(PublishState::of(&entity), PublishState::DraftOnly);

        let first = publish_entities(&db, 1, vec![entity], "publish", None).await.unwrap();
        assert_eq!(first.published.len(), 1);
        let entity = first.published[0].clone();
        assert_eq!(PublishState::of(&entity), PublishState::PublishedClean);
        let log = first.log.unwrap();
        let records = publish_log_records(&db, log.id).await.unwrap();
        assert_eq!(records[0].old_version_num, None);
        assert_eq!(records[0].new_version_num, Some(1));

        let second = publish_entities(&db, 1, vec![entity], "publish", None).await.unwrap();
        assert!(second.published.is_empty());
        assert!(second.log.is_none());
        let latest = latest_publish_logs(&db, &[1, 2]).await.unwrap();
        assert_eq!(latest[&1].id, log.id);
        assert!(!latest.contains_key(&2));
    }

    #[tokio::test]
    async fn test_delete_restore_round_trip() {
        let db = setup_test_db().await;
        let entity = component(&db, "q1").await;
        let before = (entity.draft_version_num, entity.published_version_num);

        let deleted = soft_delete(&db, entity).await.unwrap();
        assert_eq!(PublishState::of(&deleted), PublishState::Tombstoned);
        assert_eq!(deleted.draft_version_num, None);
        let deleted = soft_delete(&db, deleted).await.unwrap();

        let restored = restore(&db, deleted).await.unwrap();
        assert_eq!((restored.draft_version_num, restored.published_version_num), before);
        assert!(!restored.soft_deleted);
    }

    #[tokio::test]
    async fn test_revert_never_published_tombstones() {
        let db = setup_test_db().await;
        let entity = component(&db, "q1").await;
        let reverted = revert_entity(&db, entity).await.unwrap().unwrap();
        assert_eq!(PublishState::of(&reverted), PublishState::Tombstoned);
        assert!(revert_entity(&db, reverted).await.unwrap().is_none());
    }
}
