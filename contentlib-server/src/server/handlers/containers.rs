use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use contentlib::gateway::{ContainerChild, ContainerMetadata, PublishOutcome};
use contentlib::keys::{ContainerKey, ContainerType, LibraryKey, OpaqueKey};
use contentlib::services::{Actor, ChildrenAction};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_key, CollectionKeysRequest};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::extract::RequestActor;

#[derive(Debug, Deserialize)]
pub struct CreateContainerRequest {
    pub container_type: ContainerType,
    pub display_name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContainerRequest {
    pub display_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChildrenQuery {
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChildrenRequest {
    pub usage_keys: Vec<OpaqueKey>,
}

pub async fn create_container(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
    Json(payload): Json<CreateContainerRequest>,
) -> ApiResult<Json<ContainerMetadata>> {
    let key: LibraryKey = parse_key(&library_key)?;
    let container = state
        .gateway
        .create_container(
            &actor,
            &key,
            payload.container_type,
            &payload.display_name,
            payload.slug.as_deref(),
        )
        .await?;
    Ok(Json(container))
}

pub async fn get_container(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(container_key): Path<String>,
) -> ApiResult<Json<ContainerMetadata>> {
    let key: ContainerKey = parse_key(&container_key)?;
    Ok(Json(state.gateway.get_container(&actor, &key, true).await?))
}

pub async fn update_container(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(container_key): Path<String>,
    Json(payload): Json<UpdateContainerRequest>,
) -> ApiResult<Json<ContainerMetadata>> {
    let key: ContainerKey = parse_key(&container_key)?;
    let container = state
        .gateway
        .update_container(&actor, &key, &payload.display_name)
        .await?;
    Ok(Json(container))
}

pub async fn delete_container(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(container_key): Path<String>,
) -> ApiResult<StatusCode> {
    let key: ContainerKey = parse_key(&container_key)?;
    state.gateway.delete_container(&actor, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_container(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(container_key): Path<String>,
) -> ApiResult<StatusCode> {
    let key: ContainerKey = parse_key(&container_key)?;
    state.gateway.restore_container(&actor, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_children(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(container_key): Path<String>,
    Query(query): Query<ChildrenQuery>,
) -> ApiResult<Json<Vec<ContainerChild>>> {
    let key: ContainerKey = parse_key(&container_key)?;
    let children = state
        .gateway
        .get_container_children(&actor, &key, query.published)
        .await?;
    Ok(Json(children))
}

async fn change_children(
    state: &AppState,
    actor: &Actor,
    container_key: &str,
    child_keys: &[OpaqueKey],
    action: ChildrenAction,
) -> ApiResult<Json<ContainerMetadata>> {
    let key: ContainerKey = parse_key(container_key)?;
    let container = state
        .gateway
        .update_container_children(actor, &key, child_keys, action)
        .await?;
    Ok(Json(container))
}

pub async fn append_children(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(container_key): Path<String>,
    Json(payload): Json<ChildrenRequest>,
) -> ApiResult<Json<ContainerMetadata>> {
    change_children(
        &state,
        &actor,
        &container_key,
        &payload.usage_keys,
        ChildrenAction::Append,
    )
    .await
}

pub async fn replace_children(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(container_key): Path<String>,
    Json(payload): Json<ChildrenRequest>,
) -> ApiResult<Json<ContainerMetadata>> {
    change_children(
        &state,
        &actor,
        &container_key,
        &payload.usage_keys,
        ChildrenAction::Replace,
    )
    .await
}

pub async fn remove_children(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(container_key): Path<String>,
    Json(payload): Json<ChildrenRequest>,
) -> ApiResult<Json<ContainerMetadata>> {
    change_children(
        &state,
        &actor,
        &container_key,
        &payload.usage_keys,
        ChildrenAction::Remove,
    )
    .await
}

pub async fn publish_container(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(container_key): Path<String>,
) -> ApiResult<Json<PublishOutcome>> {
    let key: ContainerKey = parse_key(&container_key)?;
    Ok(Json(state.gateway.publish_container_changes(&actor, &key).await?))
}

pub async fn set_container_collections(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(container_key): Path<String>,
    Json(payload): Json<CollectionKeysRequest>,
) -> ApiResult<Json<Value>> {
    let key: ContainerKey = parse_key(&container_key)?;
    let collection_keys = payload.resolve(key.library_key())?;
    let current = state
        .gateway
        .set_entity_collections(&actor, &key.into(), &collection_keys)
        .await?;
    Ok(Json(json!({ "collections": current })))
}
