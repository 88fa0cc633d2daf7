//! Row-level access to publishable entities and their versions.
//!
//! Functions here are generic over [`ConnectionTrait`] so the gateway can run
//! them on a transaction. They do no permission checks and emit no events.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value;

use crate::database::entities::{
    container_children, entity_versions, publishable_entities, version_assets,
};
use crate::errors::{LibraryError, LibraryResult};
use crate::keys::OpaqueKey;

/// Everything one version holds besides its number.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionContent {
    pub title: String,
    pub olx: Option<String>,
    pub fields: Value,
    /// Child entity ids in order (containers only)
    pub children: Vec<i32>,
    /// Asset path to content row id (components only)
    pub assets: BTreeMap<String, i32>,
}

impl VersionContent {
    pub fn component(title: impl Into<String>, olx: impl Into<String>, fields: Value) -> Self {
        Self {
            title: title.into(),
            olx: Some(olx.into()),
            fields,
            children: Vec::new(),
            assets: BTreeMap::new(),
        }
    }

    pub fn container(title: impl Into<String>, children: Vec<i32>) -> Self {
        Self {
            title: title.into(),
            olx: None,
            fields: Value::Object(Default::default()),
            children,
            assets: BTreeMap::new(),
        }
    }
}

pub struct NewEntity<'a> {
    pub learning_package_id: i32,
    pub key: &'a OpaqueKey,
    pub kind: &'static str,
    pub type_name: &'a str,
    pub local_id: &'a str,
    pub created_by: Option<i32>,
}

fn entity_label(key: &OpaqueKey) -> &'static str {
    match key {
        OpaqueKey::Component(_) => "component",
        OpaqueKey::Container(_) => "container",
        OpaqueKey::Library(_) => "library",
    }
}

pub async fn find_entity<C: ConnectionTrait>(
    conn: &C,
    key: &OpaqueKey,
) -> LibraryResult<Option<publishable_entities::Model>> {
    Ok(publishable_entities::Entity::find()
        .filter(publishable_entities::Column::EntityKey.eq(key.to_string()))
        .one(conn)
        .await?)
}

/// Look up an entity by key, soft-deleted ones included.
pub async fn get_entity<C: ConnectionTrait>(
    conn: &C,
    key: &OpaqueKey,
) -> LibraryResult<publishable_entities::Model> {
    find_entity(conn, key)
        .await?
        .ok_or_else(|| LibraryError::not_found(entity_label(key), key))
}

/// Like [`get_entity`] but a soft-deleted entity counts as missing.
pub async fn get_live_entity<C: ConnectionTrait>(
    conn: &C,
    key: &OpaqueKey,
) -> LibraryResult<publishable_entities::Model> {
    let entity = get_entity(conn, key).await?;
    if entity.soft_deleted {
        return Err(LibraryError::not_found(entity_label(key), key));
    }
    Ok(entity)
}

pub async fn entities_by_ids<C: ConnectionTrait>(
    conn: &C,
    ids: &[i32],
) -> LibraryResult<HashMap<i32, publishable_entities::Model>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = publishable_entities::Entity::find()
        .filter(publishable_entities::Column::Id.is_in(ids.to_vec()))
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

pub async fn entities_in_package<C: ConnectionTrait>(
    conn: &C,
    learning_package_id: i32,
) -> LibraryResult<Vec<publishable_entities::Model>> {
    Ok(publishable_entities::Entity::find()
        .filter(publishable_entities::Column::LearningPackageId.eq(learning_package_id))
        .order_by_asc(publishable_entities::Column::Id)
        .all(conn)
        .await?)
}

pub async fn load_version<C: ConnectionTrait>(
    conn: &C,
    entity_id: i32,
    version_num: i32,
) -> LibraryResult<entity_versions::Model> {
    entity_versions::Entity::find()
        .filter(entity_versions::Column::EntityId.eq(entity_id))
        .filter(entity_versions::Column::VersionNum.eq(version_num))
        .one(conn)
        .await?
        .ok_or_else(|| {
            LibraryError::Internal(format!(
                "entity {} is missing version {}",
                entity_id, version_num
            ))
        })
}

pub async fn list_versions<C: ConnectionTrait>(
    conn: &C,
    entity_id: i32,
) -> LibraryResult<Vec<entity_versions::Model>> {
    Ok(entity_versions::Entity::find()
        .filter(entity_versions::Column::EntityId.eq(entity_id))
        .order_by_asc(entity_versions::Column::VersionNum)
        .all(conn)
        .await?)
}

pub async fn children_ids<C: ConnectionTrait>(
    conn: &C,
    version_id: i32,
) -> LibraryResult<Vec<i32>> {
    let rows = container_children::Entity::find()
        .filter(container_children::Column::VersionId.eq(version_id))
        .order_by_asc(container_children::Column::Position)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|row| row.child_entity_id).collect())
}

pub async fn asset_rows<C: ConnectionTrait>(
    conn: &C,
    version_id: i32,
) -> LibraryResult<Vec<version_assets::Model>> {
    Ok(version_assets::Entity::find()
        .filter(version_assets::Column::VersionId.eq(version_id))
        .order_by_asc(version_assets::Column::Path)
        .all(conn)
        .await?)
}

pub async fn load_content<C: ConnectionTrait>(
    conn: &C,
    version: &entity_versions::Model,
) -> LibraryResult<VersionContent> {
    let assets = asset_rows(conn, version.id)
        .await?
        .into_iter()
        .map(|row| (row.path, row.content_id))
        .collect();
    Ok(VersionContent {
        title: version.title.clone(),
        olx: version.olx.clone(),
        fields: serde_json::from_str(&version.fields)?,
        children: children_ids(conn, version.id).await?,
        assets,
    })
}

/// Content of the current draft. Fails for soft-deleted entities.
pub async fn draft_content<C: ConnectionTrait>(
    conn: &C,
    entity: &publishable_entities::Model,
) -> LibraryResult<VersionContent> {
    let version_num = entity
        .draft_version_num
        .ok_or_else(|| LibraryError::not_found("draft", &entity.entity_key))?;
    let version = load_version(conn, entity.id, version_num).await?;
    load_content(conn, &version).await
}

async fn insert_version<C: ConnectionTrait>(
    conn: &C,
    entity_id: i32,
    version_num: i32,
    content: &VersionContent,
    created_by: Option<i32>,
) -> LibraryResult<entity_versions::Model> {
    let version = entity_versions::ActiveModel {
        entity_id: Set(entity_id),
        version_num: Set(version_num),
        title: Set(content.title.clone()),
        olx: Set(content.olx.clone()),
        fields: Set(serde_json::to_string(&content.fields)?),
        created_by: Set(created_by),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| LibraryError::from_db("insert version", e))?;

    for (position, child_id) in content.children.iter().enumerate() {
        container_children::ActiveModel {
            version_id: Set(version.id),
            position: Set(position as i32),
            child_entity_id: Set(*child_id),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }

    for (path, content_id) in &content.assets {
        version_assets::ActiveModel {
            version_id: Set(version.id),
            path: Set(path.clone()),
            content_id: Set(*content_id),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }

    Ok(version)
}

/// Insert a new entity with version 1 as its draft.
pub async fn create_entity<C: ConnectionTrait>(
    conn: &C,
    new: NewEntity<'_>,
    content: &VersionContent,
) -> LibraryResult<(publishable_entities::Model, entity_versions::Model)> {
    let now = Utc::now();
    let entity = publishable_entities::ActiveModel {
        learning_package_id: Set(new.learning_package_id),
        entity_key: Set(new.key.to_string()),
        entity_kind: Set(new.kind.to_string()),
        type_name: Set(new.type_name.to_string()),
        local_id: Set(new.local_id.to_string()),
        title: Set(content.title.clone()),
        created_by: Set(new.created_by),
        created_at: Set(now),
        updated_at: Set(now),
        ..publishable_entities::ActiveModel::new()
    }
    .insert(conn)
    .await
    .map_err(|e| match LibraryError::from_db("create entity", e) {
        LibraryError::AlreadyExists(_) => {
            LibraryError::AlreadyExists(format!("'{}' already exists", new.key))
        }
        other => other,
    })?;

    let version = insert_version(conn, entity.id, 1, content, new.created_by).await?;
    Ok((entity, version))
}

/// Store `content` as the next version and point the draft at it.
///
/// Numbering continues from `latest_version_num`, so a draft that was reset
/// by a revert never reuses a number.
pub async fn append_version<C: ConnectionTrait>(
    conn: &C,
    entity: publishable_entities::Model,
    content: &VersionContent,
    created_by: Option<i32>,
) -> LibraryResult<(publishable_entities::Model, entity_versions::Model)> {
    let next = entity.latest_version_num + 1;
    let version = insert_version(conn, entity.id, next, content, created_by).await?;

    let mut active: publishable_entities::ActiveModel = entity.into();
    active.draft_version_num = Set(Some(next));
    active.latest_version_num = Set(next);
    active.title = Set(content.title.clone());
    active.updated_at = Set(Utc::now());
    let entity = active.update(conn).await?;
    Ok((entity, version))
}

/// Live containers whose current draft lists `child_id` as a child.
pub async fn parent_containers<C: ConnectionTrait>(
    conn: &C,
    child_id: i32,
) -> LibraryResult<Vec<publishable_entities::Model>> {
    let rows = container_children::Entity::find()
        .filter(container_children::Column::ChildEntityId.eq(child_id))
        .all(conn)
        .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let version_ids: Vec<i32> = rows.iter().map(|row| row.version_id).collect();
    let versions = entity_versions::Entity::find()
        .filter(entity_versions::Column::Id.is_in(version_ids))
        .all(conn)
        .await?;
    let owner_ids: Vec<i32> = versions.iter().map(|v| v.entity_id).collect();
    let owners = entities_by_ids(conn, &owner_ids).await?;

    let mut parents: Vec<publishable_entities::Model> = Vec::new();
    for version in versions {
        let Some(owner) = owners.get(&version.entity_id) else {
            continue;
        };
        let is_current = owner.draft_version_num == Some(version.version_num);
        if is_current && !parents.iter().any(|p| p.id == owner.id) {
            parents.push(owner.clone());
        }
    }
    parents.sort_by_key(|p| p.id);
    Ok(parents)
}

pub fn parse_entity_key(entity: &publishable_entities::Model) -> LibraryResult<OpaqueKey> {
    entity
        .entity_key
        .parse::<OpaqueKey>()
        .map_err(|e| LibraryError::Internal(format!("stored key is invalid: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::publishable_entities::{KIND_COMPONENT, KIND_CONTAINER};
    use crate::database::test_utils::setup_test_db;
    use serde_json::json;

    #[tokio::test]
    async fn test_versions_are_numbered_from_latest() {
        let db = setup_test_db().await;
        let key: OpaqueKey = "lb:Axim:Demo:problem:q1".parse().unwrap();
        let (entity, v1) = create_entity(
            &db,
            NewEntity {
                learning_package_id: 1,
                key: &key,
                kind: KIND_COMPONENT,
                type_name: "problem",
                local_id: "q1",
                created_by: None,
            },
            &VersionContent::component("Q1", "<problem/>", json!({})),
        )
        .await
        .unwrap();
        assert_eq!(v1.version_num, 1);
        assert_eq!(entity.draft_version_num, Some(1));

        let (entity, v2) = append_version(
            &db,
            entity,
            &VersionContent::component("Q1", "<problem>2</problem>", json!({})),
            None,
        )
        .await
        .unwrap();
        assert_eq!(v2.version_num, 2);
        assert_eq!(entity.draft_version_num, Some(2));
        assert_eq!(entity.latest_version_num, 2);

        let content = draft_content(&db, &entity).await.unwrap();
        assert_eq!(content.olx.as_deref(), Some("<problem>2</problem>"));
        let numbers: Vec<i32> = list_versions(&db, entity.id)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.version_num)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_parent_containers_follow_current_draft() {
        let db = setup_test_db().await;
        let child_key: OpaqueKey = "lb:Axim:Demo:html:h1".parse().unwrap();
        let (child, _) = create_entity(
            &db,
            NewEntity {
                learning_package_id: 1,
                key: &child_key,
                kind: KIND_COMPONENT,
                type_name: "html",
                local_id: "h1",
                created_by: None,
            },
            &VersionContent::component("H1", "<html/>", json!({})),
        )
        .await
        .unwrap();

        let unit_key: OpaqueKey = "lct:Axim:Demo:unit:u1".parse().unwrap();
        let (unit, _) = create_entity(
            &db,
            NewEntity {
                learning_package_id: 1,
                key: &unit_key,
                kind: KIND_CONTAINER,
                type_name: "unit",
                local_id: "u1",
                created_by: None,
            },
            &VersionContent::container("U1", vec![child.id]),
        )
        .await
        .unwrap();

        let parents = parent_containers(&db, child.id).await.unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].id, unit.id);

        append_version(&db, unit, &VersionContent::container("U1", vec![]), None)
            .await
            .unwrap();
        assert!(parent_containers(&db, child.id).await.unwrap().is_empty());
    }
}
