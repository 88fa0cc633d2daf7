use sea_orm::TransactionTrait;
use tracing::info;

use super::{AssetInfo, LibraryGateway};
use crate::errors::{LibraryError, LibraryResult};
use crate::events::LibraryEvent;
use crate::keys::{OpaqueKey, UsageKey};
use crate::services::asset_service::{self, AssetChunks};
use crate::services::entity_store;
use crate::services::{Action, Actor};

fn asset_info(path: String, size: i64, content_hash: String) -> AssetInfo {
    let media_type = asset_service::guess_media_type(&path).to_string();
    AssetInfo {
        path,
        size,
        content_hash,
        media_type,
    }
}

impl LibraryGateway {
    // ----- Static asset helpers --------------------------------------------

    /// Assets of the component's draft, sorted by path.
    pub async fn list_assets(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
    ) -> LibraryResult<Vec<AssetInfo>> {
        self.authorize(actor, Action::View, usage_key.library_key(), true).await?;
        let entity = entity_store::get_live_entity(&self.db, &usage_key.clone().into()).await?;
        let content = entity_store::draft_content(&self.db, &entity).await?;

        let mut assets = Vec::with_capacity(content.assets.len());
        for (path, content_id) in content.assets {
            let (size, hash) = asset_service::content_summary(&self.db, content_id).await?;
            assets.push(asset_info(path, size, hash));
        }
        Ok(assets)
    }

    /// Normalized path and stored content id of one draft asset.
    async fn draft_asset(&self, usage_key: &UsageKey, path: &str) -> LibraryResult<(String, i32)> {
        let path = asset_service::normalize_asset_path(path)?;
        let entity = entity_store::get_live_entity(&self.db, &usage_key.clone().into()).await?;
        let content = entity_store::draft_content(&self.db, &entity).await?;
        let content_id = content
            .assets
            .get(&path)
            .copied()
            .ok_or_else(|| LibraryError::not_found("asset", format!("{}/{}", usage_key, path)))?;
        Ok((path, content_id))
    }

    /// Metadata and bytes of one draft asset.
    pub async fn get_asset(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
        path: &str,
    ) -> LibraryResult<(AssetInfo, Vec<u8>)> {
        self.authorize(actor, Action::View, usage_key.library_key(), true).await?;
        let (path, content_id) = self.draft_asset(usage_key, path).await?;
        let stored = asset_service::load_content(&self.db, content_id).await?;
        Ok((asset_info(path, stored.size, stored.content_hash), stored.data))
    }

    /// Like [`Self::get_asset`], but the bytes are read from storage one
    /// configured chunk at a time as the caller pulls them.
    pub async fn asset_chunks(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
        path: &str,
    ) -> LibraryResult<(AssetInfo, AssetChunks)> {
        self.authorize(actor, Action::View, usage_key.library_key(), true).await?;
        let (path, content_id) = self.draft_asset(usage_key, path).await?;
        let (size, hash) = asset_service::content_summary(&self.db, content_id).await?;
        let chunks = AssetChunks::new(
            self.db.clone(),
            content_id,
            size.max(0) as usize,
            self.config.asset_chunk_size,
        );
        Ok((asset_info(path, size, hash), chunks))
    }

    /// Add or overwrite a draft asset. Creates a new draft version.
    pub async fn add_asset(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
        path: &str,
        data: Vec<u8>,
    ) -> LibraryResult<AssetInfo> {
        let library_key = usage_key.library_key();
        let record = self.authorize(actor, Action::Edit, library_key, false).await?;
        let path = asset_service::normalize_asset_path(path)?;
        asset_service::check_asset_size(data.len(), self.config.max_asset_size_bytes)?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let key: OpaqueKey = usage_key.clone().into();
        let entity = entity_store::get_live_entity(&txn, &key).await?;
        let stored = asset_service::store_content(&txn, record.package.id, data).await?;

        let mut content = entity_store::draft_content(&txn, &entity).await?;
        content.assets.insert(path.clone(), stored.id);
        let (entity, version) =
            entity_store::append_version(&txn, entity, &content, actor.user_id()).await?;

        let mut events = vec![LibraryEvent::ComponentUpdated {
            usage_key: usage_key.clone(),
        }];
        events.extend(Self::parent_events(&txn, entity.id, false).await?);
        txn.commit().await?;

        info!(
            "Added asset {} ({} bytes) to {} at version {}",
            path, stored.size, usage_key, version.version_num
        );
        self.events.publish_all(events).await;
        Ok(asset_info(path, stored.size, stored.content_hash))
    }

    pub async fn delete_asset(
        &self,
        actor: &Actor,
        usage_key: &UsageKey,
        path: &str,
    ) -> LibraryResult<()> {
        let library_key = usage_key.library_key();
        self.authorize(actor, Action::Edit, library_key, false).await?;
        let path = asset_service::normalize_asset_path(path)?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let key: OpaqueKey = usage_key.clone().into();
        let entity = entity_store::get_live_entity(&txn, &key).await?;
        let mut content = entity_store::draft_content(&txn, &entity).await?;
        if content.assets.remove(&path).is_none() {
            return Err(LibraryError::not_found("asset", format!("{}/{}", usage_key, path)));
        }
        let (entity, _) =
            entity_store::append_version(&txn, entity, &content, actor.user_id()).await?;

        let mut events = vec![LibraryEvent::ComponentUpdated {
            usage_key: usage_key.clone(),
        }];
        events.extend(Self::parent_events(&txn, entity.id, false).await?);
        txn.commit().await?;

        info!("Deleted asset {} from {}", path, usage_key);
        self.events.publish_all(events).await;
        Ok(())
    }
}
