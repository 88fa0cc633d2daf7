use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use contentlib::common::pagination::{PageRequest, DEFAULT_PAGE_SIZE};
use contentlib::gateway::{
    LibraryFilter, LibraryMetadata, LibraryPatch, LibraryType, NewLibrary, PublishOutcome,
};
use contentlib::keys::LibraryKey;
use contentlib::services::Action;
use serde::Deserialize;
use serde_json::{json, Value};

use super::parse_key;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::extract::RequestActor;

#[derive(Debug, Default, Deserialize)]
pub struct ListLibrariesQuery {
    pub org: Option<String>,
    pub text_search: Option<String>,
    #[serde(rename = "type")]
    pub library_type: Option<String>,
    pub order: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub pagination: Option<bool>,
}

pub async fn list_libraries(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Query(query): Query<ListLibrariesQuery>,
) -> ApiResult<Json<Value>> {
    let library_type = query
        .library_type
        .as_deref()
        .map(str::parse::<LibraryType>)
        .transpose()?;
    let filter = LibraryFilter {
        org: query.org,
        library_type,
        text_search: query.text_search,
        order: query.order,
    };

    let paginate = query.pagination.unwrap_or(true);
    let request = if paginate {
        PageRequest::new(query.page.unwrap_or(1), query.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    } else {
        PageRequest::unpaginated()
    };

    let page = state
        .gateway
        .list_libraries(&actor, Action::View, &filter, request)
        .await?;

    if !paginate {
        return Ok(Json(json!(page.items)));
    }
    Ok(Json(json!({
        "count": page.total,
        "num_pages": page.num_pages,
        "current_page": page.page,
        "results": page.items,
    })))
}

pub async fn create_library(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(payload): Json<NewLibrary>,
) -> ApiResult<Json<LibraryMetadata>> {
    let library = state.gateway.create_library(&actor, payload).await?;
    Ok(Json(library))
}

pub async fn get_library(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
) -> ApiResult<Json<LibraryMetadata>> {
    let key: LibraryKey = parse_key(&library_key)?;
    Ok(Json(state.gateway.get_library(&actor, &key).await?))
}

pub async fn update_library(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
    Json(patch): Json<LibraryPatch>,
) -> ApiResult<Json<LibraryMetadata>> {
    let key: LibraryKey = parse_key(&library_key)?;
    Ok(Json(state.gateway.update_library(&actor, &key, patch).await?))
}

pub async fn delete_library(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
) -> ApiResult<StatusCode> {
    let key: LibraryKey = parse_key(&library_key)?;
    state.gateway.delete_library(&actor, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_library(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
) -> ApiResult<StatusCode> {
    let key: LibraryKey = parse_key(&library_key)?;
    state.gateway.restore_library(&actor, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_changes(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
) -> ApiResult<Json<PublishOutcome>> {
    let key: LibraryKey = parse_key(&library_key)?;
    Ok(Json(state.gateway.publish_changes(&actor, &key).await?))
}

pub async fn revert_changes(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
) -> ApiResult<Json<Value>> {
    let key: LibraryKey = parse_key(&library_key)?;
    let reverted = state.gateway.revert_changes(&actor, &key).await?;
    Ok(Json(json!({ "reverted": reverted })))
}
