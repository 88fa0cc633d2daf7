use sea_orm::TransactionTrait;
use tracing::info;

use super::{LibraryGateway, PublishOutcome};
use crate::database::entities::publishable_entities;
use crate::errors::LibraryResult;
use crate::events::LibraryEvent;
use crate::keys::{ContainerType, LibraryKey, OpaqueKey};
use crate::services::{entity_store, lifecycle};
use crate::services::{Action, Actor};

/// Components rank 0, containers by their type so children publish first.
fn publish_rank(entity: &publishable_entities::Model) -> u8 {
    if entity.is_container() {
        ContainerType::from_name(&entity.type_name).map_or(u8::MAX, |t| t.rank())
    } else {
        0
    }
}

impl LibraryGateway {
    // ----- Library-wide lifecycle helpers ----------------------------------

    /// Publish every dirty entity in the library, pending deletes included.
    pub async fn publish_changes(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
    ) -> LibraryResult<PublishOutcome> {
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let mut entities = entity_store::entities_in_package(&txn, record.package.id).await?;
        entities.sort_by_key(|entity| (publish_rank(entity), entity.id));
        let result = lifecycle::publish_entities(
            &txn,
            record.package.id,
            entities,
            &format!("Publish {}", library_key),
            actor.user_id(),
        )
        .await?;
        txn.commit().await?;

        let mut published = Vec::with_capacity(result.published.len());
        let mut events = Vec::with_capacity(result.published.len());
        for entity in &result.published {
            let key = entity_store::parse_entity_key(entity)?;
            // a published tombstone has nothing left to announce
            if !entity.soft_deleted {
                events.extend(LibraryEvent::entity_published(&key));
            }
            published.push(key);
        }
        info!("Published {} entities in {}", published.len(), library_key);
        self.events.publish_all(events).await;
        Ok(PublishOutcome {
            published,
            log_id: result.log.map(|log| log.id),
        })
    }

    /// Discard every unpublished draft in the library. Returns the keys of
    /// the entities that changed.
    pub async fn revert_changes(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
    ) -> LibraryResult<Vec<OpaqueKey>> {
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let entities = entity_store::entities_in_package(&txn, record.package.id).await?;
        let mut reverted = Vec::new();
        let mut events = Vec::new();
        for entity in entities {
            let was_deleted = entity.soft_deleted;
            let Some(entity) = lifecycle::revert_entity(&txn, entity).await? else {
                continue;
            };
            let key = entity_store::parse_entity_key(&entity)?;
            let event = match (was_deleted, entity.soft_deleted) {
                (_, true) => LibraryEvent::entity_deleted(&key),
                (true, false) => LibraryEvent::entity_created(&key),
                (false, false) => LibraryEvent::entity_updated(&key, false),
            };
            events.extend(event);
            reverted.push(key);
        }
        txn.commit().await?;

        if !reverted.is_empty() {
            events.push(LibraryEvent::LibraryUpdated {
                library_key: library_key.clone(),
            });
        }
        info!("Reverted {} entities in {}", reverted.len(), library_key);
        self.events.publish_all(events).await;
        Ok(reverted)
    }
}
