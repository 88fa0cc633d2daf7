//! Collection rows and their membership edges.
//!
//! Callers check that collections and entities share a learning package
//! before linking them; these helpers only maintain the edges.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::database::entities::{collection_entities, collections};
use crate::errors::{LibraryError, LibraryResult};
use crate::keys::CollectionKey;

pub async fn find_collection<C: ConnectionTrait>(
    conn: &C,
    learning_package_id: i32,
    collection_id: &str,
) -> LibraryResult<Option<collections::Model>> {
    Ok(collections::Entity::find()
        .filter(collections::Column::LearningPackageId.eq(learning_package_id))
        .filter(collections::Column::Key.eq(collection_id))
        .one(conn)
        .await?)
}

pub async fn get_collection<C: ConnectionTrait>(
    conn: &C,
    learning_package_id: i32,
    key: &CollectionKey,
) -> LibraryResult<collections::Model> {
    find_collection(conn, learning_package_id, key.collection_id())
        .await?
        .ok_or_else(|| LibraryError::not_found("collection", key))
}

pub async fn list_collections<C: ConnectionTrait>(
    conn: &C,
    learning_package_id: i32,
) -> LibraryResult<Vec<collections::Model>> {
    Ok(collections::Entity::find()
        .filter(collections::Column::LearningPackageId.eq(learning_package_id))
        .filter(collections::Column::Enabled.eq(true))
        .order_by_asc(collections::Column::Key)
        .all(conn)
        .await?)
}

pub async fn create_collection<C: ConnectionTrait>(
    conn: &C,
    learning_package_id: i32,
    key: &CollectionKey,
    title: &str,
    description: &str,
    created_by: Option<i32>,
) -> LibraryResult<collections::Model> {
    if find_collection(conn, learning_package_id, key.collection_id())
        .await?
        .is_some()
    {
        return Err(LibraryError::AlreadyExists(format!(
            "collection '{}' already exists",
            key
        )));
    }

    let now = Utc::now();
    let collection = collections::ActiveModel {
        learning_package_id: Set(learning_package_id),
        key: Set(key.collection_id().to_string()),
        title: Set(title.to_string()),
        description: Set(description.to_string()),
        enabled: Set(true),
        created_by: Set(created_by),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| LibraryError::from_db("create collection", e))?;
    Ok(collection)
}

pub async fn update_collection<C: ConnectionTrait>(
    conn: &C,
    collection: collections::Model,
    title: Option<String>,
    description: Option<String>,
) -> LibraryResult<collections::Model> {
    let mut active: collections::ActiveModel = collection.into();
    if let Some(title) = title {
        active.title = Set(title);
    }
    if let Some(description) = description {
        active.description = Set(description);
    }
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

pub async fn collections_for_entity<C: ConnectionTrait>(
    conn: &C,
    entity_id: i32,
) -> LibraryResult<Vec<collections::Model>> {
    let edges = collection_entities::Entity::find()
        .filter(collection_entities::Column::EntityId.eq(entity_id))
        .all(conn)
        .await?;
    if edges.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = edges.into_iter().map(|edge| edge.collection_id).collect();
    Ok(collections::Entity::find()
        .filter(collections::Column::Id.is_in(ids))
        .order_by_asc(collections::Column::Key)
        .all(conn)
        .await?)
}

pub async fn entity_ids_in_collection<C: ConnectionTrait>(
    conn: &C,
    collection_id: i32,
) -> LibraryResult<Vec<i32>> {
    let edges = collection_entities::Entity::find()
        .filter(collection_entities::Column::CollectionId.eq(collection_id))
        .order_by_asc(collection_entities::Column::Id)
        .all(conn)
        .await?;
    Ok(edges.into_iter().map(|edge| edge.entity_id).collect())
}

async fn insert_edge<C: ConnectionTrait>(
    conn: &C,
    collection_id: i32,
    entity_id: i32,
    created_by: Option<i32>,
) -> LibraryResult<()> {
    collection_entities::ActiveModel {
        collection_id: Set(collection_id),
        entity_id: Set(entity_id),
        created_by: Set(created_by),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

async fn delete_edge<C: ConnectionTrait>(
    conn: &C,
    collection_id: i32,
    entity_id: i32,
) -> LibraryResult<()> {
    collection_entities::Entity::delete_many()
        .filter(collection_entities::Column::CollectionId.eq(collection_id))
        .filter(collection_entities::Column::EntityId.eq(entity_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Replace the memberships of one entity. Returns the collection ids that
/// were added and removed.
pub async fn set_entity_collections<C: ConnectionTrait>(
    conn: &C,
    entity_id: i32,
    collection_ids: &[i32],
    created_by: Option<i32>,
) -> LibraryResult<(Vec<i32>, Vec<i32>)> {
    let current: HashSet<i32> = collections_for_entity(conn, entity_id)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    let wanted: HashSet<i32> = collection_ids.iter().copied().collect();

    let mut added: Vec<i32> = wanted.difference(&current).copied().collect();
    let mut removed: Vec<i32> = current.difference(&wanted).copied().collect();
    added.sort_unstable();
    removed.sort_unstable();

    for collection_id in &added {
        insert_edge(conn, *collection_id, entity_id, created_by).await?;
    }
    for collection_id in &removed {
        delete_edge(conn, *collection_id, entity_id).await?;
    }
    Ok((added, removed))
}

/// Link entities to a collection. Returns the ids that were not yet members.
pub async fn add_entities<C: ConnectionTrait>(
    conn: &C,
    collection_id: i32,
    entity_ids: &[i32],
    created_by: Option<i32>,
) -> LibraryResult<Vec<i32>> {
    let mut members: HashSet<i32> = entity_ids_in_collection(conn, collection_id)
        .await?
        .into_iter()
        .collect();
    let mut added = Vec::new();
    for entity_id in entity_ids {
        if members.insert(*entity_id) {
            insert_edge(conn, collection_id, *entity_id, created_by).await?;
            added.push(*entity_id);
        }
    }
    Ok(added)
}

/// Unlink entities from a collection. Returns the ids that were members.
pub async fn remove_entities<C: ConnectionTrait>(
    conn: &C,
    collection_id: i32,
    entity_ids: &[i32],
) -> LibraryResult<Vec<i32>> {
    let mut members: HashSet<i32> = entity_ids_in_collection(conn, collection_id)
        .await?
        .into_iter()
        .collect();
    let mut removed = Vec::new();
    for entity_id in entity_ids {
        if members.remove(entity_id) {
            delete_edge(conn, collection_id, *entity_id).await?;
            removed.push(*entity_id);
        }
    }
    Ok(removed)
}
