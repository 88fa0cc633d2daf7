use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use sea_orm::sea_query::Condition;
use serde_json::{Map, Value};
use tracing::info;

use super::{
    ComponentFilter, ComponentMetadata, ComponentVersionView, LibraryGateway, LibraryType,
    PublishOutcome,
};
use crate::common::pagination::{Page, PageRequest};
use crate::database::entities::publishable_entities::{self, KIND_COMPONENT};
use crate::errors::{LibraryError, LibraryResult};
use crate::events::LibraryEvent;
use crate::keys::{ContainerType, LibraryKey, OpaqueKey, UsageKey};
use crate::services::entity_store::{self, NewEntity, VersionContent};
use crate::services::{lifecycle, Action, Actor};

static ROOT_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:<\?xml[^>]*\?>\s*)?<([A-Za-z_][\w.\-]*)([^>]*)>")
        .expect("root tag pattern is valid")
});
static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][\w.\-]*)\s*=\s*"([^"]*)""#).expect("attribute pattern is valid")
});

/// Attributes of the OLX root element. The payload itself is stored verbatim.
fn olx_fields(olx: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(root) = ROOT_TAG_RE.captures(olx) {
        let attributes = root.get(2).map(|m| m.as_str()).unwrap_or_default();
        for attribute in ATTRIBUTE_RE.captures_iter(attributes) {
            fields.insert(attribute[1].to_string(), Value::String(attribute[2].to_string()));
        }
    }
    fields
}

fn component_content(
    block_type: &str,
    olx: &str,
    assets: Option<VersionContent>,
) -> VersionContent {
    let fields = olx_fields(olx);
    let title = fields
        .get("display_name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(block_type)
        .to_string();
    let mut content = VersionContent::component(title, olx, Value::Object(fields));
    if let Some(previous) = assets {
        content.assets = previous.assets;
    }
    content
}

impl LibraryGateway {
    // ----- Component helpers -----------------------------------------------

    pub async fn create_component(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        block_type: &str,
        local_id: &str,
        olx: &str,
    ) -> LibraryResult<ComponentMetadata> {
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;
        if ContainerType::from_name(block_type).is_some() {
            return Err(LibraryError::IncompatibleTypes(format!(
                "'{}' is a container type; use create_container",
                block_type
            )));
        }
        let usage_key = library_key.usage_key(block_type, local_id)?;
        let library_type: LibraryType = record.library.library_type.parse()?;
        if !library_type.allows_block_type(block_type) {
            return Err(LibraryError::IncompatibleTypes(format!(
                "a {} library cannot hold '{}' blocks",
                library_type, block_type
            )));
        }

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let live = publishable_entities::Entity::find()
            .filter(publishable_entities::Column::LearningPackageId.eq(record.package.id))
            .filter(publishable_entities::Column::EntityKind.eq(KIND_COMPONENT))
            .filter(publishable_entities::Column::SoftDeleted.eq(false))
            .count(&txn)
            .await?;
        if live >= self.config.max_components_per_library {
            return Err(LibraryError::QuotaExceeded(format!(
                "library {} already holds {} components",
                library_key, live
            )));
        }

        let key = OpaqueKey::Component(usage_key.clone());
        if entity_store::find_entity(&txn, &key).await?.is_some() {
            return Err(LibraryError::AlreadyExists(format!("component '{}' already exists", key)));
        }
        let (entity, _) = entity_store::create_entity(
            &txn,
            NewEntity {
                learning_package_id: record.package.id,
                key: &key,
                kind: KIND_COMPONENT,
                type_name: block_type,
                local_id,
                created_by: actor.user_id(),
            },
            &component_content(block_type, olx, None),
        )
        .await?;
        txn.commit().await?;

        info!("Created component {}", usage_key);
        self.events
            .publish(LibraryEvent::ComponentCreated {
                usage_key: usage_key.clone(),
            })
            .await;
        Ok(ComponentMetadata::from_entity(usage_key, &entity, None))
    }

    /// Component details, soft-deleted components included.
    pub async fn get_component(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
        include_collections: bool,
    ) -> LibraryResult<ComponentMetadata> {
        self.authorize(actor, Action::View, usage_key.library_key(), true).await?;
        let entity = entity_store::get_entity(&self.db, &usage_key.clone().into()).await?;
        let collections = if include_collections {
            Some(Self::collection_keys_for(&self.db, usage_key.library_key(), entity.id).await?)
        } else {
            None
        };
        Ok(ComponentMetadata::from_entity(usage_key.clone(), &entity, collections))
    }

    /// Payload in the draft or published view; `None` when the view has no version.
    pub async fn get_component_version(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
        published: bool,
    ) -> LibraryResult<Option<ComponentVersionView>> {
        self.authorize(actor, Action::View, usage_key.library_key(), true).await?;
        let entity = entity_store::get_entity(&self.db, &usage_key.clone().into()).await?;
        let pointer = if published {
            entity.published_version_num
        } else {
            entity.draft_version_num
        };
        let Some(version_num) = pointer else {
            return Ok(None);
        };
        let version = entity_store::load_version(&self.db, entity.id, version_num).await?;
        Ok(Some(ComponentVersionView {
            usage_key: usage_key.clone(),
            version_num,
            display_name: version.title.clone(),
            olx: version.olx.clone().unwrap_or_default(),
            fields: serde_json::from_str(&version.fields)?,
            created: version.created_at,
        }))
    }

    /// Store a new draft payload. Returns the new version number.
    pub async fn set_component_payload(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
        olx: &str,
    ) -> LibraryResult<i32> {
        self.set_component_payload_checked(actor, usage_key, olx, None).await
    }

    /// Like [`Self::set_component_payload`], but fails with `Conflict` when the
    /// current draft is not `expected_version`.
    pub async fn set_component_payload_checked(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
        olx: &str,
        expected_version: Option<i32>,
    ) -> LibraryResult<i32> {
        let library_key = usage_key.library_key();
        self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let entity = entity_store::get_live_entity(&txn, &usage_key.clone().into()).await?;
        if let Some(expected) = expected_version {
            if entity.draft_version_num != Some(expected) {
                return Err(LibraryError::Conflict(format!(
                    "{} draft is at version {:?}, not {}",
                    usage_key, entity.draft_version_num, expected
                )));
            }
        }
        let previous = entity_store::draft_content(&txn, &entity).await?;
        let content = component_content(usage_key.block_type(), olx, Some(previous));
        let (entity, version) =
            entity_store::append_version(&txn, entity, &content, actor.user_id()).await?;

        let mut events = vec![LibraryEvent::ComponentUpdated {
            usage_key: usage_key.clone(),
        }];
        events.extend(Self::parent_events(&txn, entity.id, false).await?);
        txn.commit().await?;

        info!("Component {} now at version {}", usage_key, version.version_num);
        self.events.publish_all(events).await;
        Ok(version.version_num)
    }

    pub async fn delete_component(&self, actor: &Actor, usage_key: &UsageKey) -> LibraryResult<()> {
        let library_key = usage_key.library_key();
        self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let key: OpaqueKey = usage_key.clone().into();
        let entity = entity_store::get_live_entity(&txn, &key).await?;
        // parents are resolved before the draft pointer goes away
        let mut events = vec![LibraryEvent::ComponentDeleted {
            usage_key: usage_key.clone(),
        }];
        events.extend(Self::parent_events(&txn, entity.id, false).await?);
        for collection_key in Self::collection_keys_for(&txn, library_key, entity.id).await? {
            events.push(LibraryEvent::collection_updated(&collection_key));
        }
        lifecycle::soft_delete(&txn, entity).await?;
        txn.commit().await?;

        info!("Deleted component {}", usage_key);
        self.events.publish_all(events).await;
        Ok(())
    }

    pub async fn restore_component(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
    ) -> LibraryResult<ComponentMetadata> {
        let library_key = usage_key.library_key();
        self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let key: OpaqueKey = usage_key.clone().into();
        let entity = entity_store::get_entity(&txn, &key).await?;
        let was_deleted = entity.soft_deleted;
        let entity = lifecycle::restore(&txn, entity).await?;

        let mut events = Vec::new();
        if was_deleted {
            events.push(LibraryEvent::ComponentCreated {
                usage_key: usage_key.clone(),
            });
            events.extend(Self::parent_events(&txn, entity.id, false).await?);
            for collection_key in Self::collection_keys_for(&txn, library_key, entity.id).await? {
                events.push(LibraryEvent::collection_updated(&collection_key));
            }
        }
        txn.commit().await?;

        info!("Restored component {}", usage_key);
        self.events.publish_all(events).await;
        Ok(ComponentMetadata::from_entity(usage_key.clone(), &entity, None))
    }

    /// Publish one component's draft, notifying the containers that include it.
    pub async fn publish_component(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
    ) -> LibraryResult<PublishOutcome> {
        let library_key = usage_key.library_key();
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let key: OpaqueKey = usage_key.clone().into();
        let entity = entity_store::get_entity(&txn, &key).await?;
        let entity_id = entity.id;
        let result = lifecycle::publish_entities(
            &txn,
            record.package.id,
            vec![entity],
            &format!("Publish {}", usage_key),
            actor.user_id(),
        )
        .await?;

        let mut events = Vec::new();
        // a published tombstone has nothing left to announce
        if result.published.iter().any(|entity| !entity.soft_deleted) {
            events.push(LibraryEvent::ComponentPublished {
                usage_key: usage_key.clone(),
            });
            events.extend(Self::parent_events(&txn, entity_id, true).await?);
        }
        txn.commit().await?;

        info!("Published {} ({} entities)", usage_key, result.published.len());
        self.events.publish_all(events).await;
        Ok(PublishOutcome {
            published: result.published.iter().map(|_| key.clone()).collect(),
            log_id: result.log.map(|log| log.id),
        })
    }

    /// Live components of a library, newest first.
    pub async fn list_components(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        filter: &ComponentFilter,
        page: PageRequest,
    ) -> LibraryResult<Page<ComponentMetadata>> {
        let record = self.authorize(actor, Action::View, library_key, true).await?;

        let mut condition = Condition::all()
            .add(publishable_entities::Column::LearningPackageId.eq(record.package.id))
            .add(publishable_entities::Column::EntityKind.eq(KIND_COMPONENT))
            .add(publishable_entities::Column::SoftDeleted.eq(false));
        if let Some(text) = filter.text_search.as_deref().filter(|t| !t.trim().is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(publishable_entities::Column::Title.contains(text))
                    .add(publishable_entities::Column::LocalId.contains(text)),
            );
        }
        if !filter.block_types.is_empty() {
            condition = condition.add(
                publishable_entities::Column::TypeName.is_in(filter.block_types.clone()),
            );
        }

        let query = publishable_entities::Entity::find()
            .filter(condition)
            .order_by_desc(publishable_entities::Column::CreatedAt)
            .order_by_desc(publishable_entities::Column::Id);
        let (entities, total) = if page.is_unpaginated() {
            let all = query.all(&self.db).await?;
            let total = all.len() as u64;
            (all, total)
        } else {
            let paginator = query.paginate(&self.db, page.page_size());
            let total = paginator.num_items().await?;
            (paginator.fetch_page(page.page_index()).await?, total)
        };

        let mut items = Vec::with_capacity(entities.len());
        for entity in entities {
            match entity_store::parse_entity_key(&entity)? {
                OpaqueKey::Component(usage_key) => {
                    items.push(ComponentMetadata::from_entity(usage_key, &entity, None))
                }
                other => {
                    return Err(LibraryError::Internal(format!(
                        "component row carries non-component key {}",
                        other
                    )))
                }
            }
        }
        Ok(Page::new(items, total, page))
    }
}
