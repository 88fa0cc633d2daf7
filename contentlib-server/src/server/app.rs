use anyhow::{anyhow, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, patch, post, put},
    Router,
};
use contentlib::LibraryGateway;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{assets, blocks, collections, containers, health, libraries, team};

#[derive(Clone)]
pub struct AppState {
    pub gateway: LibraryGateway,
}

pub fn create_app(gateway: LibraryGateway, cors_origin: Option<&str>) -> Result<Router> {
    let body_limit = gateway.config().max_asset_size_bytes;
    let state = AppState { gateway };

    let cors = match cors_origin {
        Some(origin) if origin != "*" => CorsLayer::new().allow_origin(
            origin
                .parse::<HeaderValue>()
                .map_err(|e| anyhow!("Invalid CORS origin: {}", e))?,
        ),
        _ => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ])
    .allow_headers(Any)
    .allow_credentials(false);

    let app = Router::new()
        .route("/health", get(health::health_check))
        // Libraries
        .route(
            "/libraries/v2/",
            get(libraries::list_libraries).post(libraries::create_library),
        )
        .route(
            "/libraries/v2/:library_key/",
            get(libraries::get_library)
                .patch(libraries::update_library)
                .delete(libraries::delete_library),
        )
        .route("/libraries/v2/:library_key/restore/", post(libraries::restore_library))
        .route(
            "/libraries/v2/:library_key/commit/",
            post(libraries::publish_changes).delete(libraries::revert_changes),
        )
        // Team
        .route("/libraries/v2/:library_key/team/", get(team::get_team))
        .route(
            "/libraries/v2/:library_key/team/user/:username/",
            get(team::get_user_grant)
                .put(team::set_user_grant)
                .delete(team::remove_user_grant),
        )
        .route(
            "/libraries/v2/:library_key/team/group/:group_name/",
            put(team::set_group_grant).delete(team::remove_group_grant),
        )
        // Components
        .route(
            "/libraries/v2/:library_key/blocks/",
            get(blocks::list_blocks).post(blocks::create_block),
        )
        .route(
            "/libraries/v2/blocks/:usage_key/",
            get(blocks::get_block).delete(blocks::delete_block),
        )
        .route(
            "/libraries/v2/blocks/:usage_key/olx/",
            get(blocks::get_block_olx).post(blocks::set_block_olx),
        )
        .route("/libraries/v2/blocks/:usage_key/publish/", post(blocks::publish_block))
        .route("/libraries/v2/blocks/:usage_key/restore/", post(blocks::restore_block))
        .route(
            "/libraries/v2/blocks/:usage_key/collections/",
            patch(blocks::set_block_collections),
        )
        // Static assets
        .route("/libraries/v2/blocks/:usage_key/assets", get(assets::list_assets))
        .route(
            "/libraries/v2/blocks/:usage_key/assets/*path",
            get(assets::get_asset)
                .put(assets::put_asset)
                .delete(assets::delete_asset),
        )
        // Containers
        .route(
            "/libraries/v2/:library_key/containers/",
            post(containers::create_container),
        )
        .route(
            "/libraries/v2/containers/:container_key/",
            get(containers::get_container)
                .patch(containers::update_container)
                .delete(containers::delete_container),
        )
        .route(
            "/libraries/v2/containers/:container_key/children/",
            get(containers::get_children)
                .post(containers::append_children)
                .patch(containers::replace_children)
                .delete(containers::remove_children),
        )
        .route(
            "/libraries/v2/containers/:container_key/publish/",
            post(containers::publish_container),
        )
        .route(
            "/libraries/v2/containers/:container_key/restore/",
            post(containers::restore_container),
        )
        .route(
            "/libraries/v2/containers/:container_key/collections/",
            patch(containers::set_container_collections),
        )
        // Collections
        .route(
            "/libraries/v2/:library_key/collections/",
            get(collections::list_collections).post(collections::create_collection),
        )
        .route(
            "/libraries/v2/:library_key/collections/:collection_id/",
            get(collections::get_collection)
                .patch(collections::update_collection)
                .delete(collections::delete_collection),
        )
        .route(
            "/libraries/v2/:library_key/collections/:collection_id/items/",
            patch(collections::add_items).delete(collections::remove_items),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}
