use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Condition, Expr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use super::{
    LibraryFilter, LibraryGateway, LibraryMetadata, LibraryPatch, LibraryRecord, LibraryType,
    NewLibrary,
};
use crate::common::pagination::{Page, PageRequest};
use crate::database::entities::publishable_entities::KIND_COMPONENT;
use crate::database::entities::{
    content_libraries, learning_packages, library_permissions, publishable_entities, users,
};
use crate::errors::{LibraryError, LibraryResult};
use crate::events::LibraryEvent;
use crate::keys::LibraryKey;
use crate::services::lifecycle;
use crate::services::{AccessLevel, Action, Actor};

impl LibraryGateway {
    // ----- Library helpers -------------------------------------------------

    pub async fn create_library(
        &self,
        actor: &Actor,
        new: NewLibrary,
    ) -> LibraryResult<LibraryMetadata> {
        self.permissions.ensure_can_create_library(actor)?;
        let key = LibraryKey::new(&new.org, &new.slug)?;
        if new.title.trim().is_empty() {
            return Err(LibraryError::Validation("library title is required".to_string()));
        }

        let _guard = self.locks.acquire(&key).await;
        let txn = self.db.begin().await?;
        if Self::find_library(&txn, &key).await?.is_some() {
            return Err(LibraryError::AlreadyExists(format!("library '{}' already exists", key)));
        }

        let now = Utc::now();
        let package = learning_packages::ActiveModel {
            key: Set(key.to_string()),
            title: Set(new.title.clone()),
            description: Set(new.description.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| LibraryError::from_db("create learning package", e))?;

        let library = content_libraries::ActiveModel {
            org: Set(new.org.clone()),
            slug: Set(new.slug.clone()),
            library_type: Set(new.library_type.as_str().to_string()),
            learning_package_id: Set(package.id),
            allow_public_learning: Set(new.allow_public_learning),
            allow_public_read: Set(new.allow_public_read),
            license: Set(new.license.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..content_libraries::ActiveModel::new()
        }
        .insert(&txn)
        .await
        .map_err(|e| LibraryError::from_db("create library", e))?;

        if let Some(user_id) = actor.user_id() {
            library_permissions::ActiveModel {
                library_id: Set(library.id),
                user_id: Set(Some(user_id)),
                group_id: Set(None),
                access_level: Set(AccessLevel::Admin.as_str().to_string()),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        let record = LibraryRecord {
            key: key.clone(),
            library,
            package,
        };
        let metadata = Self::library_metadata(&txn, &record).await?;
        txn.commit().await?;

        info!("Created library {}", key);
        self.events
            .publish(LibraryEvent::LibraryCreated { library_key: key })
            .await;
        Ok(metadata)
    }

    /// Library details. Deleted libraries stay visible to lookups by key.
    pub async fn get_library(
        &self,
        actor: &Actor,
        key: &LibraryKey,
    ) -> LibraryResult<LibraryMetadata> {
        let record = self.authorize(actor, Action::View, key, true).await?;
        Self::library_metadata(&self.db, &record).await
    }

    pub async fn update_library(
        &self,
        actor: &Actor,
        key: &LibraryKey,
        patch: LibraryPatch,
    ) -> LibraryResult<LibraryMetadata> {
        self.authorize(actor, Action::Edit, key, false).await?;

        let _guard = self.locks.acquire(key).await;
        let txn = self.db.begin().await?;
        let record = Self::find_library(&txn, key)
            .await?
            .ok_or_else(|| LibraryError::not_found("library", key))?;
        let now = Utc::now();

        if let Some(library_type) = patch.library_type {
            if library_type != LibraryType::Complex {
                let live = Self::live_components(&txn, record.package.id).await?;
                if let Some(other) = live
                    .iter()
                    .find(|entity| !library_type.allows_block_type(&entity.type_name))
                {
                    return Err(LibraryError::IncompatibleTypes(format!(
                        "library {} contains '{}' blocks and cannot become a {} library",
                        key, other.type_name, library_type
                    )));
                }
            }
        }

        let mut library: content_libraries::ActiveModel = record.library.into();
        if let Some(library_type) = patch.library_type {
            library.library_type = Set(library_type.as_str().to_string());
        }
        if let Some(license) = patch.license {
            library.license = Set(license);
        }
        if let Some(allow) = patch.allow_public_learning {
            library.allow_public_learning = Set(allow);
        }
        if let Some(allow) = patch.allow_public_read {
            library.allow_public_read = Set(allow);
        }
        if let Some(allow) = patch.allow_lti {
            library.allow_lti = Set(allow);
        }
        library.updated_at = Set(now);
        let library = library.update(&txn).await?;

        let mut package: learning_packages::ActiveModel = record.package.into();
        if let Some(title) = patch.title {
            package.title = Set(title);
        }
        if let Some(description) = patch.description {
            package.description = Set(description);
        }
        package.updated_at = Set(now);
        let package = package.update(&txn).await?;

        let record = LibraryRecord {
            key: key.clone(),
            library,
            package,
        };
        let metadata = Self::library_metadata(&txn, &record).await?;
        txn.commit().await?;

        info!("Updated library {}", key);
        self.events
            .publish(LibraryEvent::LibraryUpdated {
                library_key: key.clone(),
            })
            .await;
        Ok(metadata)
    }

    /// Tombstone the library together with its learning package.
    pub async fn delete_library(&self, actor: &Actor, key: &LibraryKey) -> LibraryResult<()> {
        self.authorize(actor, Action::Delete, key, false).await?;
        self.set_library_deleted(key, true).await?;
        info!("Deleted library {}", key);
        self.events
            .publish(LibraryEvent::LibraryDeleted {
                library_key: key.clone(),
            })
            .await;
        Ok(())
    }

    pub async fn restore_library(&self, actor: &Actor, key: &LibraryKey) -> LibraryResult<()> {
        self.authorize(actor, Action::Delete, key, true).await?;
        self.set_library_deleted(key, false).await?;
        info!("Restored library {}", key);
        self.events
            .publish(LibraryEvent::LibraryUpdated {
                library_key: key.clone(),
            })
            .await;
        Ok(())
    }

    async fn set_library_deleted(&self, key: &LibraryKey, deleted: bool) -> LibraryResult<()> {
        let _guard = self.locks.acquire(key).await;
        let txn = self.db.begin().await?;
        let record = Self::find_library(&txn, key)
            .await?
            .ok_or_else(|| LibraryError::not_found("library", key))?;
        let now = Utc::now();
        let deleted_at = deleted.then_some(now);

        let mut library: content_libraries::ActiveModel = record.library.into();
        library.deleted_at = Set(deleted_at);
        library.updated_at = Set(now);
        library.update(&txn).await?;

        let mut package: learning_packages::ActiveModel = record.package.into();
        package.deleted_at = Set(deleted_at);
        package.updated_at = Set(now);
        package.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Libraries on which `actor` may perform `action`, filtered and paged.
    /// The permission rule is applied in the query itself.
    pub async fn list_libraries(
        &self,
        actor: &Actor,
        action: Action,
        filter: &LibraryFilter,
        page: PageRequest,
    ) -> LibraryResult<Page<LibraryMetadata>> {
        let predicate = self.permissions.predicate(actor, action).await?;

        let mut condition = Condition::all().add(content_libraries::Column::DeletedAt.is_null());
        if let Some(allowed) = predicate.to_condition() {
            condition = condition.add(allowed);
        }
        if let Some(org) = &filter.org {
            condition = condition.add(content_libraries::Column::Org.eq(org.as_str()));
        }
        if let Some(library_type) = filter.library_type {
            condition = condition.add(
                content_libraries::Column::LibraryType.eq(library_type.as_str()),
            );
        }
        if let Some(text) = filter.text_search.as_deref().filter(|t| !t.trim().is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(learning_packages::Column::Title.contains(text))
                    .add(learning_packages::Column::Key.contains(text)),
            );
        }

        let mut query = content_libraries::Entity::find()
            .find_also_related(learning_packages::Entity)
            .filter(condition);
        let order = filter.order.as_deref().unwrap_or("key");
        let (descending, field) = match order.strip_prefix('-') {
            Some(field) => (true, field),
            None => (false, order),
        };
        query = match (field, descending) {
            ("title", false) => query.order_by_asc(learning_packages::Column::Title),
            ("title", true) => query.order_by_desc(learning_packages::Column::Title),
            ("created", false) => query.order_by_asc(content_libraries::Column::CreatedAt),
            ("created", true) => query.order_by_desc(content_libraries::Column::CreatedAt),
            ("key", false) => query
                .order_by_asc(content_libraries::Column::Org)
                .order_by_asc(content_libraries::Column::Slug),
            ("key", true) => query
                .order_by_desc(content_libraries::Column::Org)
                .order_by_desc(content_libraries::Column::Slug),
            _ => {
                return Err(LibraryError::Validation(format!(
                    "Invalid library order: {}",
                    order
                )))
            }
        };
        query = query.order_by_asc(content_libraries::Column::Id);

        let (rows, total) = if page.is_unpaginated() {
            let all = query.all(&self.db).await?;
            let total = all.len() as u64;
            (all, total)
        } else {
            let paginator = query.paginate(&self.db, page.page_size());
            let total = paginator.num_items().await?;
            (paginator.fetch_page(page.page_index()).await?, total)
        };

        let mut records = Vec::with_capacity(rows.len());
        for (library, package) in rows {
            let key = LibraryKey::new(&library.org, &library.slug)?;
            let package = package.ok_or_else(|| {
                LibraryError::Internal(format!("library {} has no learning package", key))
            })?;
            records.push(LibraryRecord {
                key,
                library,
                package,
            });
        }

        let package_ids: Vec<i32> = records.iter().map(|record| record.package.id).collect();
        let mut stats = Self::package_stats(&self.db, &package_ids).await?;
        let items = records
            .iter()
            .map(|record| {
                let stats = stats.remove(&record.package.id).unwrap_or_default();
                Self::metadata_from(record, stats)
            })
            .collect::<LibraryResult<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }

    pub(crate) async fn live_components<C: ConnectionTrait>(
        conn: &C,
        learning_package_id: i32,
    ) -> LibraryResult<Vec<publishable_entities::Model>> {
        Ok(publishable_entities::Entity::find()
            .filter(publishable_entities::Column::LearningPackageId.eq(learning_package_id))
            .filter(publishable_entities::Column::EntityKind.eq(KIND_COMPONENT))
            .filter(publishable_entities::Column::SoftDeleted.eq(false))
            .all(conn)
            .await?)
    }

    pub(crate) async fn library_metadata<C: ConnectionTrait>(
        conn: &C,
        record: &LibraryRecord,
    ) -> LibraryResult<LibraryMetadata> {
        let mut stats = Self::package_stats(conn, &[record.package.id]).await?;
        let stats = stats.remove(&record.package.id).unwrap_or_default();
        Self::metadata_from(record, stats)
    }

    /// Block counts, pending-change flags and last publish of several packages,
    /// in a fixed number of queries regardless of how many are asked for.
    async fn package_stats<C: ConnectionTrait>(
        conn: &C,
        package_ids: &[i32],
    ) -> LibraryResult<HashMap<i32, PackageStats>> {
        let mut stats: HashMap<i32, PackageStats> = package_ids
            .iter()
            .map(|id| (*id, PackageStats::default()))
            .collect();
        if package_ids.is_empty() {
            return Ok(stats);
        }

        let counts: Vec<(i32, i64, i64, i64)> = publishable_entities::Entity::find()
            .select_only()
            .column(publishable_entities::Column::LearningPackageId)
            .column_as(
                Expr::cust(format!(
                    "COALESCE(SUM(CASE WHEN entity_kind = '{}' AND NOT soft_deleted \
                     THEN 1 ELSE 0 END), 0)",
                    KIND_COMPONENT
                )),
                "num_blocks",
            )
            .column_as(
                Expr::cust(
                    "COALESCE(SUM(CASE WHEN NOT soft_deleted \
                     AND draft_version_num IS NOT published_version_num THEN 1 ELSE 0 END), 0)",
                ),
                "unpublished_changes",
            )
            .column_as(
                Expr::cust(
                    "COALESCE(SUM(CASE WHEN soft_deleted \
                     AND published_version_num IS NOT NULL THEN 1 ELSE 0 END), 0)",
                ),
                "unpublished_deletes",
            )
            .filter(
                publishable_entities::Column::LearningPackageId.is_in(package_ids.iter().copied()),
            )
            .group_by(publishable_entities::Column::LearningPackageId)
            .into_tuple()
            .all(conn)
            .await?;
        for (package_id, blocks, changes, deletes) in counts {
            if let Some(entry) = stats.get_mut(&package_id) {
                entry.num_blocks = blocks.max(0) as u64;
                entry.has_unpublished_changes = changes > 0;
                entry.has_unpublished_deletes = deletes > 0;
            }
        }

        let logs = lifecycle::latest_publish_logs(conn, package_ids).await?;
        let publisher_ids: Vec<i32> = logs.values().filter_map(|log| log.published_by).collect();
        let usernames: HashMap<i32, String> = if publisher_ids.is_empty() {
            HashMap::new()
        } else {
            users::Entity::find()
                .filter(users::Column::Id.is_in(publisher_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|user| (user.id, user.username))
                .collect()
        };
        for (package_id, log) in logs {
            if let Some(entry) = stats.get_mut(&package_id) {
                entry.last_published = Some(log.published_at);
                entry.published_by = log.published_by.and_then(|id| usernames.get(&id).cloned());
            }
        }
        Ok(stats)
    }

    fn metadata_from(
        record: &LibraryRecord,
        stats: PackageStats,
    ) -> LibraryResult<LibraryMetadata> {
        Ok(LibraryMetadata {
            key: record.key.clone(),
            org: record.library.org.clone(),
            slug: record.library.slug.clone(),
            title: record.package.title.clone(),
            description: record.package.description.clone(),
            library_type: record.library.library_type.parse()?,
            license: record.library.license.clone(),
            allow_public_learning: record.library.allow_public_learning,
            allow_public_read: record.library.allow_public_read,
            allow_lti: record.library.allow_lti,
            num_blocks: stats.num_blocks,
            last_published: stats.last_published,
            published_by: stats.published_by,
            has_unpublished_changes: stats.has_unpublished_changes,
            has_unpublished_deletes: stats.has_unpublished_deletes,
            created: record.library.created_at,
            updated: record.library.updated_at,
            deleted: record.library.deleted_at.is_some(),
        })
    }
}

#[derive(Debug, Default)]
struct PackageStats {
    num_blocks: u64,
    has_unpublished_changes: bool,
    has_unpublished_deletes: bool,
    last_published: Option<DateTime<Utc>>,
    published_by: Option<String>,
}
