use std::io;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use contentlib::gateway::AssetInfo;
use contentlib::keys::UsageKey;
use contentlib::LibraryError;
use futures_util::stream;
use serde_json::{json, Value};
use tracing::error;

use super::parse_key;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::extract::RequestActor;

pub async fn list_assets(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(usage_key): Path<String>,
) -> ApiResult<Json<Value>> {
    let key: UsageKey = parse_key(&usage_key)?;
    let files = state.gateway.list_assets(&actor, &key).await?;
    Ok(Json(json!({ "files": files })))
}

/// Stream the draft asset, reading one configured chunk from storage at a time.
pub async fn get_asset(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((usage_key, path)): Path<(String, String)>,
) -> ApiResult<Response> {
    let key: UsageKey = parse_key(&usage_key)?;
    let (info, chunks) = state.gateway.asset_chunks(&actor, &key, &path).await?;

    let content_type = HeaderValue::from_str(&info.media_type).map_err(|e| {
        LibraryError::Internal(format!("Invalid media type {}: {}", info.media_type, e))
    })?;
    let body = Body::from_stream(stream::unfold(Some(chunks), |state| async move {
        let mut chunks = state?;
        match chunks.next_chunk().await {
            Ok(Some(bytes)) => Some((Ok(Bytes::from(bytes)), Some(chunks))),
            Ok(None) => None,
            Err(e) => {
                error!("Asset stream failed: {}", e);
                Some((Err(io::Error::other(e.to_string())), None))
            }
        }
    }));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, HeaderValue::from(info.size)),
        ],
        body,
    )
        .into_response())
}

pub async fn put_asset(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((usage_key, path)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<AssetInfo>> {
    let key: UsageKey = parse_key(&usage_key)?;
    let info = state.gateway.add_asset(&actor, &key, &path, body.to_vec()).await?;
    Ok(Json(info))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((usage_key, path)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let key: UsageKey = parse_key(&usage_key)?;
    state.gateway.delete_asset(&actor, &key, &path).await?;
    Ok(StatusCode::NO_CONTENT)
}
