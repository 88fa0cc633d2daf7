use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use contentlib::gateway::{CollectionMetadata, CollectionPatch};
use contentlib::keys::{LibraryKey, OpaqueKey};
use serde::Deserialize;

use super::parse_key;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::extract::RequestActor;

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CollectionItemsRequest {
    pub usage_keys: Vec<OpaqueKey>,
}

pub async fn list_collections(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
) -> ApiResult<Json<Vec<CollectionMetadata>>> {
    let key: LibraryKey = parse_key(&library_key)?;
    Ok(Json(state.gateway.list_collections(&actor, &key).await?))
}

pub async fn create_collection(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
    Json(payload): Json<CreateCollectionRequest>,
) -> ApiResult<Json<CollectionMetadata>> {
    let key: LibraryKey = parse_key(&library_key)?;
    let collection = state
        .gateway
        .create_collection(&actor, &key, &payload.key, &payload.title, &payload.description)
        .await?;
    Ok(Json(collection))
}

pub async fn get_collection(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((library_key, collection_id)): Path<(String, String)>,
) -> ApiResult<Json<CollectionMetadata>> {
    let key: LibraryKey = parse_key(&library_key)?;
    Ok(Json(state.gateway.get_collection(&actor, &key, &collection_id).await?))
}

pub async fn update_collection(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((library_key, collection_id)): Path<(String, String)>,
    Json(patch): Json<CollectionPatch>,
) -> ApiResult<Json<CollectionMetadata>> {
    let key: LibraryKey = parse_key(&library_key)?;
    let collection = state
        .gateway
        .update_collection(&actor, &key, &collection_id, patch)
        .await?;
    Ok(Json(collection))
}

pub async fn delete_collection(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((library_key, collection_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let key: LibraryKey = parse_key(&library_key)?;
    state.gateway.delete_collection(&actor, &key, &collection_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_items(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((library_key, collection_id)): Path<(String, String)>,
    Json(payload): Json<CollectionItemsRequest>,
) -> ApiResult<Json<CollectionMetadata>> {
    let key: LibraryKey = parse_key(&library_key)?;
    let collection = state
        .gateway
        .update_collection_items(&actor, &key, &collection_id, &payload.usage_keys, false)
        .await?;
    Ok(Json(collection))
}

pub async fn remove_items(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((library_key, collection_id)): Path<(String, String)>,
    Json(payload): Json<CollectionItemsRequest>,
) -> ApiResult<Json<CollectionMetadata>> {
    let key: LibraryKey = parse_key(&library_key)?;
    let collection = state
        .gateway
        .update_collection_items(&actor, &key, &collection_id, &payload.usage_keys, true)
        .await?;
    Ok(Json(collection))
}
