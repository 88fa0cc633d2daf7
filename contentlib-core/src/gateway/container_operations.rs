use sea_orm::TransactionTrait;
use tracing::info;

use super::{ContainerChild, ContainerMetadata, LibraryGateway, PublishOutcome};
use crate::database::entities::publishable_entities::KIND_CONTAINER;
use crate::errors::{LibraryError, LibraryResult};
use crate::events::LibraryEvent;
use crate::keys::{ContainerKey, ContainerType, LibraryKey, OpaqueKey};
use crate::services::container_service::{self, ChildrenAction};
use crate::services::entity_store::{self, NewEntity, VersionContent};
use crate::services::lifecycle::{self, PublishState};
use crate::services::{Action, Actor};

impl LibraryGateway {
    // ----- Container helpers -----------------------------------------------

    /// Create an empty container. Without `local_id` one is derived from the title.
    pub async fn create_container(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        container_type: ContainerType,
        title: &str,
        local_id: Option<&str>,
    ) -> LibraryResult<ContainerMetadata> {
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;
        let local_id = match local_id {
            Some(local_id) => local_id.to_string(),
            None => container_service::generate_local_id(container_type, title),
        };
        let container_key = library_key.container_key(container_type, &local_id)?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let key = OpaqueKey::Container(container_key.clone());
        if entity_store::find_entity(&txn, &key).await?.is_some() {
            return Err(LibraryError::AlreadyExists(format!("container '{}' already exists", key)));
        }
        let (entity, _) = entity_store::create_entity(
            &txn,
            NewEntity {
                learning_package_id: record.package.id,
                key: &key,
                kind: KIND_CONTAINER,
                type_name: container_type.as_str(),
                local_id: &local_id,
                created_by: actor.user_id(),
            },
            &VersionContent::container(title, Vec::new()),
        )
        .await?;
        txn.commit().await?;

        info!("Created container {}", container_key);
        self.events
            .publish(LibraryEvent::ContainerCreated {
                container_key: container_key.clone(),
            })
            .await;
        Ok(ContainerMetadata::from_entity(container_key, &entity, None))
    }

    /// Rename a container. The children carry over to the new version.
    pub async fn update_container(
        &self,
        actor: &Actor,
        container_key: &ContainerKey,
        display_name: &str,
    ) -> LibraryResult<ContainerMetadata> {
        let library_key = container_key.library_key();
        self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let entity = entity_store::get_live_entity(&txn, &container_key.clone().into()).await?;
        let mut content = entity_store::draft_content(&txn, &entity).await?;
        content.title = display_name.to_string();
        let (entity, _) =
            entity_store::append_version(&txn, entity, &content, actor.user_id()).await?;
        txn.commit().await?;

        info!("Renamed container {}", container_key);
        self.events
            .publish(LibraryEvent::ContainerUpdated {
                container_key: container_key.clone(),
                background: false,
            })
            .await;
        Ok(ContainerMetadata::from_entity(container_key.clone(), &entity, None))
    }

    pub async fn get_container(
        &self,
        actor: &Actor,
        container_key: &ContainerKey,
        include_collections: bool,
    ) -> LibraryResult<ContainerMetadata> {
        let library_key = container_key.library_key();
        self.authorize(actor, Action::View, library_key, true).await?;
        let entity = entity_store::get_entity(&self.db, &container_key.clone().into()).await?;
        let collections = if include_collections {
            Some(Self::collection_keys_for(&self.db, library_key, entity.id).await?)
        } else {
            None
        };
        Ok(ContainerMetadata::from_entity(container_key.clone(), &entity, collections))
    }

    pub async fn delete_container(
        &self,
        actor: &Actor,
        container_key: &ContainerKey,
    ) -> LibraryResult<()> {
        let library_key = container_key.library_key();
        self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let entity = entity_store::get_live_entity(&txn, &container_key.clone().into()).await?;
        let mut events = vec![LibraryEvent::ContainerDeleted {
            container_key: container_key.clone(),
        }];
        events.extend(Self::parent_events(&txn, entity.id, false).await?);
        for collection_key in Self::collection_keys_for(&txn, library_key, entity.id).await? {
            events.push(LibraryEvent::collection_updated(&collection_key));
        }
        lifecycle::soft_delete(&txn, entity).await?;
        txn.commit().await?;

        info!("Deleted container {}", container_key);
        self.events.publish_all(events).await;
        Ok(())
    }

    pub async fn restore_container(
        &self,
        actor: &Actor,
        container_key: &ContainerKey,
    ) -> LibraryResult<ContainerMetadata> {
        let library_key = container_key.library_key();
        self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let entity = entity_store::get_entity(&txn, &container_key.clone().into()).await?;
        let was_deleted = entity.soft_deleted;
        let entity = lifecycle::restore(&txn, entity).await?;

        let mut events = Vec::new();
        if was_deleted {
            events.push(LibraryEvent::ContainerCreated {
                container_key: container_key.clone(),
            });
            events.extend(Self::parent_events(&txn, entity.id, false).await?);
            for collection_key in Self::collection_keys_for(&txn, library_key, entity.id).await? {
                events.push(LibraryEvent::collection_updated(&collection_key));
            }
        }
        txn.commit().await?;

        info!("Restored container {}", container_key);
        self.events.publish_all(events).await;
        Ok(ContainerMetadata::from_entity(container_key.clone(), &entity, None))
    }

    /// Ordered children in the draft or published view.
    pub async fn get_container_children(
        &self,
        actor: &Actor,
        container_key: &ContainerKey,
        published: bool,
    ) -> LibraryResult<Vec<ContainerChild>> {
        self.authorize(actor, Action::View, container_key.library_key(), true).await?;
        let entity = entity_store::get_entity(&self.db, &container_key.clone().into()).await?;
        let view = container_service::children_view(&self.db, &entity, published).await?;

        let mut children = Vec::with_capacity(view.len());
        for (child, version_num) in view {
            let display_name = if published {
                entity_store::load_version(&self.db, child.id, version_num).await?.title
            } else {
                child.title.clone()
            };
            children.push(ContainerChild {
                key: entity_store::parse_entity_key(&child)?,
                display_name,
                version_num,
                state: PublishState::of(&child),
            });
        }
        Ok(children)
    }

    /// Append, remove or replace children. Every child must be a live entity
    /// of this library exactly one rank below the container.
    pub async fn update_container_children(
        &self,
        actor: &Actor,
        container_key: &ContainerKey,
        child_keys: &[OpaqueKey],
        action: ChildrenAction,
    ) -> LibraryResult<ContainerMetadata> {
        let library_key = container_key.library_key();
        self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let entity = entity_store::get_live_entity(&txn, &container_key.clone().into()).await?;
        let ids: Vec<i32> = match action {
            ChildrenAction::Remove => {
                let mut ids = Vec::with_capacity(child_keys.len());
                for key in child_keys {
                    ids.push(entity_store::get_entity(&txn, key).await?.id);
                }
                ids
            }
            ChildrenAction::Append | ChildrenAction::Replace => {
                container_service::resolve_children(&txn, container_key, child_keys)
                    .await?
                    .into_iter()
                    .map(|child| child.id)
                    .collect()
            }
        };

        let mut content = entity_store::draft_content(&txn, &entity).await?;
        content.children = container_service::apply_action(&content.children, action, &ids);
        let (entity, _) =
            entity_store::append_version(&txn, entity, &content, actor.user_id()).await?;

        let mut events = vec![LibraryEvent::ContainerUpdated {
            container_key: container_key.clone(),
            background: false,
        }];
        events.extend(Self::parent_events(&txn, entity.id, false).await?);
        txn.commit().await?;

        info!(
            "Container {} children updated ({:?}, {} keys)",
            container_key,
            action,
            child_keys.len()
        );
        self.events.publish_all(events).await;
        Ok(ContainerMetadata::from_entity(container_key.clone(), &entity, None))
    }

    /// Publish the container and every dirty descendant, children first.
    pub async fn publish_container_changes(
        &self,
        actor: &Actor,
        container_key: &ContainerKey,
    ) -> LibraryResult<PublishOutcome> {
        let library_key = container_key.library_key();
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let root = entity_store::get_entity(&txn, &container_key.clone().into()).await?;
        let closure = lifecycle::container_closure(&txn, root).await?;
        let result = lifecycle::publish_entities(
            &txn,
            record.package.id,
            closure,
            &format!("Publish {}", container_key),
            actor.user_id(),
        )
        .await?;
        txn.commit().await?;

        let mut published = Vec::with_capacity(result.published.len());
        let mut events = Vec::with_capacity(result.published.len());
        for entity in &result.published {
            let key = entity_store::parse_entity_key(entity)?;
            if !entity.soft_deleted {
                events.extend(LibraryEvent::entity_published(&key));
            }
            published.push(key);
        }
        info!("Published {} entities under {}", published.len(), container_key);
        self.events.publish_all(events).await;
        Ok(PublishOutcome {
            published,
            log_id: result.log.map(|log| log.id),
        })
    }
}
