use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use contentlib::common::pagination::{PageRequest, DEFAULT_PAGE_SIZE};
use contentlib::gateway::{ComponentFilter, ComponentMetadata, PublishOutcome};
use contentlib::keys::{LibraryKey, UsageKey};
use contentlib::LibraryError;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_key, CollectionKeysRequest};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::extract::RequestActor;

#[derive(Debug, Default, Deserialize)]
pub struct ListBlocksQuery {
    pub text_search: Option<String>,
    /// Comma separated block types
    pub block_type: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBlockRequest {
    pub block_type: String,
    pub definition_id: String,
    pub olx: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetOlxRequest {
    pub olx: String,
    /// Draft version the client last saw; a mismatch is rejected as a conflict
    pub expected_version: Option<i32>,
}

pub async fn list_blocks(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
    Query(query): Query<ListBlocksQuery>,
) -> ApiResult<Json<Value>> {
    let key: LibraryKey = parse_key(&library_key)?;
    let filter = ComponentFilter {
        text_search: query.text_search,
        block_types: query
            .block_type
            .map(|types| {
                types
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
    };
    let request =
        PageRequest::new(query.page.unwrap_or(1), query.page_size.unwrap_or(DEFAULT_PAGE_SIZE));

    let page = state.gateway.list_components(&actor, &key, &filter, request).await?;
    Ok(Json(json!({
        "count": page.total,
        "num_pages": page.num_pages,
        "current_page": page.page,
        "results": page.items,
    })))
}

pub async fn create_block(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
    Json(payload): Json<CreateBlockRequest>,
) -> ApiResult<Json<ComponentMetadata>> {
    let key: LibraryKey = parse_key(&library_key)?;
    let olx = payload
        .olx
        .unwrap_or_else(|| format!("<{}/>", payload.block_type));
    let component = state
        .gateway
        .create_component(&actor, &key, &payload.block_type, &payload.definition_id, &olx)
        .await?;
    Ok(Json(component))
}

pub async fn get_block(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(usage_key): Path<String>,
) -> ApiResult<Json<ComponentMetadata>> {
    let key: UsageKey = parse_key(&usage_key)?;
    Ok(Json(state.gateway.get_component(&actor, &key, true).await?))
}

pub async fn delete_block(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(usage_key): Path<String>,
) -> ApiResult<StatusCode> {
    let key: UsageKey = parse_key(&usage_key)?;
    state.gateway.delete_component(&actor, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_block(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(usage_key): Path<String>,
) -> ApiResult<StatusCode> {
    let key: UsageKey = parse_key(&usage_key)?;
    state.gateway.restore_component(&actor, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_block_olx(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(usage_key): Path<String>,
) -> ApiResult<Json<Value>> {
    let key: UsageKey = parse_key(&usage_key)?;
    let version = state
        .gateway
        .get_component_version(&actor, &key, false)
        .await?
        .ok_or_else(|| LibraryError::not_found("component draft", &key))?;
    Ok(Json(json!({
        "olx": version.olx,
        "version_num": version.version_num,
    })))
}

pub async fn set_block_olx(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(usage_key): Path<String>,
    Json(payload): Json<SetOlxRequest>,
) -> ApiResult<Json<Value>> {
    let key: UsageKey = parse_key(&usage_key)?;
    let version_num = state
        .gateway
        .set_component_payload_checked(&actor, &key, &payload.olx, payload.expected_version)
        .await?;
    Ok(Json(json!({
        "olx": payload.olx,
        "version_num": version_num,
    })))
}

pub async fn publish_block(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(usage_key): Path<String>,
) -> ApiResult<Json<PublishOutcome>> {
    let key: UsageKey = parse_key(&usage_key)?;
    Ok(Json(state.gateway.publish_component(&actor, &key).await?))
}

pub async fn set_block_collections(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(usage_key): Path<String>,
    Json(payload): Json<CollectionKeysRequest>,
) -> ApiResult<Json<Value>> {
    let key: UsageKey = parse_key(&usage_key)?;
    let collection_keys = payload.resolve(key.library_key())?;
    let current = state
        .gateway
        .set_entity_collections(&actor, &key.into(), &collection_keys)
        .await?;
    Ok(Json(json!({ "collections": current })))
}
