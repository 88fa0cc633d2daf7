use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use contentlib::gateway::TeamGrant;
use contentlib::keys::LibraryKey;
use contentlib::services::AccessLevel;
use contentlib::LibraryError;
use serde::Deserialize;

use super::parse_key;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::extract::RequestActor;

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub access_level: AccessLevel,
}

pub async fn get_team(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(library_key): Path<String>,
) -> ApiResult<Json<Vec<TeamGrant>>> {
    let key: LibraryKey = parse_key(&library_key)?;
    Ok(Json(state.gateway.get_library_team(&actor, &key).await?))
}

pub async fn get_user_grant(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((library_key, username)): Path<(String, String)>,
) -> ApiResult<Json<TeamGrant>> {
    let key: LibraryKey = parse_key(&library_key)?;
    let grant = state
        .gateway
        .get_library_user_permissions(&actor, &key, &username)
        .await?
        .ok_or_else(|| LibraryError::not_found("team grant", &username))?;
    Ok(Json(grant))
}

pub async fn set_user_grant(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((library_key, username)): Path<(String, String)>,
    Json(payload): Json<GrantRequest>,
) -> ApiResult<StatusCode> {
    let key: LibraryKey = parse_key(&library_key)?;
    state
        .gateway
        .set_library_user_permissions(&actor, &key, &username, Some(payload.access_level))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_user_grant(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((library_key, username)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let key: LibraryKey = parse_key(&library_key)?;
    state
        .gateway
        .set_library_user_permissions(&actor, &key, &username, None)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_group_grant(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((library_key, group_name)): Path<(String, String)>,
    Json(payload): Json<GrantRequest>,
) -> ApiResult<StatusCode> {
    let key: LibraryKey = parse_key(&library_key)?;
    state
        .gateway
        .set_library_group_permissions(&actor, &key, &group_name, Some(payload.access_level))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_group_grant(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((library_key, group_name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let key: LibraryKey = parse_key(&library_key)?;
    state
        .gateway
        .set_library_group_permissions(&actor, &key, &group_name, None)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
