use std::collections::HashSet;

use sea_orm::{ConnectionTrait, TransactionTrait};
use tracing::info;

use super::{collection_key_of, CollectionMetadata, CollectionPatch, LibraryGateway};
use crate::database::entities::collections;
use crate::errors::{LibraryError, LibraryResult};
use crate::events::LibraryEvent;
use crate::keys::{CollectionKey, LibraryKey, OpaqueKey};
use crate::services::{collection_service, entity_store};
use crate::services::{Action, Actor};

impl LibraryGateway {
    // ----- Collection helpers ----------------------------------------------

    pub async fn create_collection(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        collection_id: &str,
        title: &str,
        description: &str,
    ) -> LibraryResult<CollectionMetadata> {
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;
        let key = library_key.collection_key(collection_id)?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let collection = collection_service::create_collection(
            &txn,
            record.package.id,
            &key,
            title,
            description,
            actor.user_id(),
        )
        .await?;
        txn.commit().await?;

        info!("Created collection {}", key);
        self.events.publish(LibraryEvent::collection_created(&key)).await;
        Ok(CollectionMetadata::from_model(key, &collection, None))
    }

    pub async fn update_collection(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        collection_id: &str,
        patch: CollectionPatch,
    ) -> LibraryResult<CollectionMetadata> {
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;
        let key = library_key.collection_key(collection_id)?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let collection = collection_service::get_collection(&txn, record.package.id, &key).await?;
        let collection =
            collection_service::update_collection(
                &txn,
                collection,
                patch.title,
                patch.description,
            )
            .await?;
        txn.commit().await?;

        info!("Updated collection {}", key);
        self.events.publish(LibraryEvent::collection_updated(&key)).await;
        Ok(CollectionMetadata::from_model(key, &collection, None))
    }

    /// Collection details including the keys of its members.
    pub async fn get_collection(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        collection_id: &str,
    ) -> LibraryResult<CollectionMetadata> {
        let record = self.authorize(actor, Action::View, library_key, true).await?;
        let key = library_key.collection_key(collection_id)?;
        let collection =
            collection_service::get_collection(&self.db, record.package.id, &key).await?;
        let entity_keys = Self::member_keys(&self.db, &collection).await?;
        Ok(CollectionMetadata::from_model(key, &collection, Some(entity_keys)))
    }

    pub async fn list_collections(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
    ) -> LibraryResult<Vec<CollectionMetadata>> {
        let record = self.authorize(actor, Action::View, library_key, true).await?;
        collection_service::list_collections(&self.db, record.package.id)
            .await?
            .iter()
            .map(|collection| {
                Ok(CollectionMetadata::from_model(
                    collection_key_of(library_key, collection)?,
                    collection,
                    None,
                ))
            })
            .collect()
    }

    /// Collections cannot be deleted yet; the verb exists so callers get a
    /// clear answer.
    pub async fn delete_collection(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        collection_id: &str,
    ) -> LibraryResult<()> {
        self.authorize(actor, Action::Edit, library_key, false).await?;
        library_key.collection_key(collection_id)?;
        Err(LibraryError::Validation("collection deletion is not supported".to_string()))
    }

    /// Replace the collections `entity_key` belongs to. Every collection must
    /// be in the entity's own library.
    pub async fn set_entity_collections(
        &self,
        actor: &Actor,
        entity_key: &OpaqueKey,
        collection_keys: &[CollectionKey],
    ) -> LibraryResult<Vec<CollectionKey>> {
        let library_key = entity_key.library_key();
        if let OpaqueKey::Library(_) = entity_key {
            return Err(LibraryError::Validation(
                "only components and containers can join collections".to_string(),
            ));
        }
        if let Some(foreign) = collection_keys
            .iter()
            .find(|key| key.library_key() != library_key)
        {
            return Err(LibraryError::InvalidScope(format!(
                "collection {} is not in library {}",
                foreign, library_key
            )));
        }
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let entity = entity_store::get_live_entity(&txn, entity_key).await?;
        let mut wanted = Vec::with_capacity(collection_keys.len());
        for key in collection_keys {
            wanted.push(collection_service::get_collection(&txn, record.package.id, key).await?);
        }
        let wanted_ids: Vec<i32> = wanted.iter().map(|c| c.id).collect();
        let before = collection_service::collections_for_entity(&txn, entity.id).await?;
        let (added, removed) =
            collection_service::set_entity_collections(
                &txn,
                entity.id,
                &wanted_ids,
                actor.user_id(),
            )
            .await?;

        let mut events = Vec::new();
        if !added.is_empty() || !removed.is_empty() {
            events.push(LibraryEvent::EntityCollectionsChanged {
                entity_key: entity_key.clone(),
            });
            let changed: HashSet<i32> = added.iter().chain(removed.iter()).copied().collect();
            for collection in before.iter().chain(wanted.iter()) {
                if changed.contains(&collection.id) {
                    let key = collection_key_of(library_key, collection)?;
                    let event = LibraryEvent::collection_updated(&key);
                    if !events.contains(&event) {
                        events.push(event);
                    }
                }
            }
        }
        let current = Self::collection_keys_for(&txn, library_key, entity.id).await?;
        txn.commit().await?;

        info!(
            "{} collections: {} added, {} removed",
            entity_key,
            added.len(),
            removed.len()
        );
        self.events.publish_all(events).await;
        Ok(current)
    }

    /// Add entities to, or with `remove` take them out of, one collection.
    pub async fn update_collection_items(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        collection_id: &str,
        entity_keys: &[OpaqueKey],
        remove: bool,
    ) -> LibraryResult<CollectionMetadata> {
        if let Some(foreign) = entity_keys.iter().find(|key| key.library_key() != library_key) {
            return Err(LibraryError::InvalidScope(format!(
                "{} is not in library {}",
                foreign, library_key
            )));
        }
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;
        let key = library_key.collection_key(collection_id)?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let collection = collection_service::get_collection(&txn, record.package.id, &key).await?;
        let mut ids = Vec::with_capacity(entity_keys.len());
        for entity_key in entity_keys {
            let entity = if remove {
                entity_store::get_entity(&txn, entity_key).await?
            } else {
                entity_store::get_live_entity(&txn, entity_key).await?
            };
            ids.push((entity_key.clone(), entity.id));
        }
        let entity_ids: Vec<i32> = ids.iter().map(|(_, id)| *id).collect();
        let changed = if remove {
            collection_service::remove_entities(&txn, collection.id, &entity_ids).await?
        } else {
            collection_service::add_entities(&txn, collection.id, &entity_ids, actor.user_id())
                .await?
        };
        let members = Self::member_keys(&txn, &collection).await?;
        txn.commit().await?;

        let mut events = Vec::new();
        if !changed.is_empty() {
            events.push(LibraryEvent::collection_updated(&key));
            for (entity_key, id) in &ids {
                if changed.contains(id) {
                    events.push(LibraryEvent::EntityCollectionsChanged {
                        entity_key: entity_key.clone(),
                    });
                }
            }
        }
        info!(
            "Collection {}: {} entities {}",
            key,
            changed.len(),
            if remove { "removed" } else { "added" }
        );
        self.events.publish_all(events).await;
        Ok(CollectionMetadata::from_model(key, &collection, Some(members)))
    }

    async fn member_keys<C: ConnectionTrait>(
        conn: &C,
        collection: &collections::Model,
    ) -> LibraryResult<Vec<OpaqueKey>> {
        let ids = collection_service::entity_ids_in_collection(conn, collection.id).await?;
        let by_id = entity_store::entities_by_ids(conn, &ids).await?;
        ids.iter()
            .filter_map(|id| by_id.get(id))
            .map(entity_store::parse_entity_key)
            .collect()
    }
}
