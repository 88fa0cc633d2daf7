//! REST surface tests
//!
//! Exercise the HTTP mapping of the library gateway: routes, status codes and
//! the JSON error envelope.

use anyhow::Result;
use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use contentlib::database::migrations::Migrator;
use contentlib::services::NewUser;
use contentlib::{LibraryConfig, LibraryGateway};
use contentlib_server::server::app::create_app;
use contentlib_test_utils::fixtures::PROBLEM_OLX;
use contentlib_test_utils::TestDb;
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};

async fn setup_test_server() -> Result<TestServer> {
    let db = TestDb::new_in_memory().connect().await?;
    Migrator::up(&db, None).await?;

    let gateway = LibraryGateway::new(db, LibraryConfig::default());
    gateway.users().create_user(NewUser::new("ana").course_creator()).await?;
    gateway.users().create_user(NewUser::new("bob")).await?;

    let app = create_app(gateway, Some("*"))?;
    Ok(TestServer::new(app)?)
}

fn as_user(request: TestRequest, username: &'static str) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-username"),
        HeaderValue::from_static(username),
    )
}

async fn create_demo_library(server: &TestServer) -> String {
    let response = as_user(server.post("/libraries/v2/"), "ana")
        .json(&json!({
            "org": "Axim",
            "slug": "Demo",
            "title": "Demo library",
            "description": "Shared problems",
            "type": "complex",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    body["key"].as_str().unwrap().to_string()
}

async fn create_problem(server: &TestServer, library_key: &str, local_id: &str) -> String {
    let response = as_user(server.post(&format!("/libraries/v2/{}/blocks/", library_key)), "ana")
        .json(&json!({
            "block_type": "problem",
            "definition_id": local_id,
            "olx": PROBLEM_OLX,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    body["usage_key"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let server = setup_test_server().await?;

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["service"], "contentlib-server");
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_library_crud_api() -> Result<()> {
    let server = setup_test_server().await?;
    let key = create_demo_library(&server).await;
    assert_eq!(key, "lib:Axim:Demo");

    // duplicate slug
    let response = as_user(server.post("/libraries/v2/"), "ana")
        .json(&json!({"org": "Axim", "slug": "Demo", "title": "Again"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "ALREADY_EXISTS");

    let response = as_user(server.get("/libraries/v2/"), "ana").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["key"], "lib:Axim:Demo");

    let response = as_user(server.get("/libraries/v2/?pagination=false&org=Axim"), "ana").await;
    let body: Value = response.json();
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let response = as_user(server.patch(&format!("/libraries/v2/{}/", key)), "ana")
        .json(&json!({"title": "Renamed"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["description"], "Shared problems");

    let response = as_user(server.delete(&format!("/libraries/v2/{}/", key)), "ana").await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let body: Value = as_user(server.get("/libraries/v2/"), "ana").await.json();
    assert_eq!(body["count"], 0);

    let response = as_user(server.post(&format!("/libraries/v2/{}/restore/", key)), "ana").await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn test_permission_and_key_errors() -> Result<()> {
    let server = setup_test_server().await?;
    let key = create_demo_library(&server).await;

    // non-creators cannot create libraries
    let response = as_user(server.post("/libraries/v2/"), "bob")
        .json(&json!({"org": "Axim", "slug": "Mine", "title": "Mine"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    // private libraries are invisible to outsiders and anonymous callers
    let response = as_user(server.get(&format!("/libraries/v2/{}/", key)), "bob").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let response = server.get(&format!("/libraries/v2/{}/", key)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = as_user(server.get("/libraries/v2/lib:Axim/"), "ana").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_KEY");
    Ok(())
}

#[tokio::test]
async fn test_block_olx_publish_flow() -> Result<()> {
    let server = setup_test_server().await?;
    let library = create_demo_library(&server).await;
    let usage_key = create_problem(&server, &library, "q1").await;
    assert_eq!(usage_key, "lb:Axim:Demo:problem:q1");

    let response =
        as_user(server.get(&format!("/libraries/v2/blocks/{}/olx/", usage_key)), "ana").await;
    let body: Value = response.json();
    assert_eq!(body["olx"], PROBLEM_OLX);
    assert_eq!(body["version_num"], 1);

    let response = as_user(server.post(&format!("/libraries/v2/blocks/{}/olx/", usage_key)), "ana")
        .json(&json!({"olx": "<problem display_name=\"Edited\"/>"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["version_num"], 2);

    // stale writers lose
    let response = as_user(server.post(&format!("/libraries/v2/blocks/{}/olx/", usage_key)), "ana")
        .json(&json!({"olx": "<problem/>", "expected_version": 1}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response =
        as_user(server.post(&format!("/libraries/v2/blocks/{}/publish/", usage_key)), "ana").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["published"], json!([usage_key.clone()]));

    let body: Value = as_user(server.get(&format!("/libraries/v2/blocks/{}/", usage_key)), "ana")
        .await
        .json();
    assert_eq!(body["display_name"], "Edited");
    assert_eq!(body["published_version_num"], 2);
    assert_eq!(body["has_unpublished_changes"], false);

    let response =
        as_user(server.delete(&format!("/libraries/v2/blocks/{}/", usage_key)), "ana").await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let body: Value = as_user(server.get(&format!("/libraries/v2/{}/blocks/", library)), "ana")
        .await
        .json();
    assert_eq!(body["count"], 0);

    let response =
        as_user(server.post(&format!("/libraries/v2/blocks/{}/restore/", usage_key)), "ana").await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let body: Value = as_user(server.get(&format!("/libraries/v2/{}/blocks/", library)), "ana")
        .await
        .json();
    assert_eq!(body["count"], 1);
    Ok(())
}

#[tokio::test]
async fn test_asset_routes() -> Result<()> {
    let server = setup_test_server().await?;
    let library = create_demo_library(&server).await;
    let usage_key = create_problem(&server, &library, "q1").await;

    let response = as_user(
        server.put(&format!("/libraries/v2/blocks/{}/assets/static/my%20notes.txt", usage_key)),
        "ana",
    )
    .bytes(Bytes::from_static(b"hello asset"))
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["path"], "static/my_notes.txt");
    assert_eq!(body["media_type"], "text/plain");

    let response = as_user(
        server.get(&format!("/libraries/v2/blocks/{}/assets/static/my_notes.txt", usage_key)),
        "ana",
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "hello asset");
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok()),
        Some("text/plain")
    );

    // same bytes under another extension are served with their own type
    as_user(
        server.put(&format!("/libraries/v2/blocks/{}/assets/static/copy.png", usage_key)),
        "ana",
    )
    .bytes(Bytes::from_static(b"hello asset"))
    .await;
    let response = as_user(
        server.get(&format!("/libraries/v2/blocks/{}/assets/static/copy.png", usage_key)),
        "ana",
    )
    .await;
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok()),
        Some("image/png")
    );
    assert_eq!(response.text(), "hello asset");

    let assets_url = format!("/libraries/v2/blocks/{}/assets", usage_key);
    let body: Value = as_user(server.get(&assets_url), "ana").await.json();
    assert_eq!(body["files"][0]["path"], "static/copy.png");
    assert_eq!(body["files"][1]["path"], "static/my_notes.txt");

    let response = as_user(
        server.put(&format!("/libraries/v2/blocks/{}/assets/static//x.txt", usage_key)),
        "ana",
    )
    .bytes(Bytes::from_static(b"x"))
    .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_PATH");

    let response = as_user(
        server.delete(&format!("/libraries/v2/blocks/{}/assets/static/my_notes.txt", usage_key)),
        "ana",
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let response = as_user(
        server.get(&format!("/libraries/v2/blocks/{}/assets/static/my_notes.txt", usage_key)),
        "ana",
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_container_children_api() -> Result<()> {
    let server = setup_test_server().await?;
    let library = create_demo_library(&server).await;
    let q1 = create_problem(&server, &library, "q1").await;
    let q2 = create_problem(&server, &library, "q2").await;

    let response = as_user(server.post(&format!("/libraries/v2/{}/containers/", library)), "ana")
        .json(&json!({"container_type": "unit", "display_name": "Unit 1", "slug": "u1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let unit = body["container_key"].as_str().unwrap().to_string();
    assert_eq!(unit, "lct:Axim:Demo:unit:u1");

    let children_url = format!("/libraries/v2/containers/{}/children/", unit);
    let response = as_user(server.post(&children_url), "ana")
        .json(&json!({"usage_keys": [q1, q2]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = as_user(server.patch(&children_url), "ana")
        .json(&json!({"usage_keys": [q2, q1]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let children: Vec<Value> = as_user(server.get(&children_url), "ana").await.json();
    let keys: Vec<&str> = children.iter().filter_map(|c| c["key"].as_str()).collect();
    assert_eq!(keys, vec![q2.as_str(), q1.as_str()]);

    let response = as_user(server.delete(&children_url), "ana")
        .json(&json!({"usage_keys": [q2]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let children: Vec<Value> = as_user(server.get(&children_url), "ana").await.json();
    assert_eq!(children.len(), 1);

    // units hold components, not units
    let response = as_user(server.post(&children_url), "ana")
        .json(&json!({"usage_keys": [unit]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "INCOMPATIBLE_TYPES");

    let response =
        as_user(server.post(&format!("/libraries/v2/containers/{}/publish/", unit)), "ana").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let published_url = format!("{}?published=true", children_url);
    let published: Vec<Value> = as_user(server.get(&published_url), "ana").await.json();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0]["key"], q1.as_str());
    Ok(())
}

#[tokio::test]
async fn test_collections_api() -> Result<()> {
    let server = setup_test_server().await?;
    let library = create_demo_library(&server).await;
    let q1 = create_problem(&server, &library, "q1").await;

    let response = as_user(server.post(&format!("/libraries/v2/{}/collections/", library)), "ana")
        .json(&json!({"key": "favorites", "title": "Favorites"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["key"], "lib-collection:Axim:Demo:favorites");

    let response = as_user(
        server.patch(&format!("/libraries/v2/{}/collections/favorites/items/", library)),
        "ana",
    )
    .json(&json!({"usage_keys": [q1]}))
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["entity_keys"], json!([q1.clone()]));

    let block_collections_url = format!("/libraries/v2/blocks/{}/collections/", q1);
    let response = as_user(server.patch(&block_collections_url), "ana")
        .json(&json!({"collection_keys": []}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["collections"], json!([]));

    let response = as_user(server.patch(&block_collections_url), "ana")
        .json(&json!({"collection_keys": ["lib-collection:Axim:Other:x"]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_SCOPE");

    let response = as_user(
        server.delete(&format!("/libraries/v2/{}/collections/favorites/", library)),
        "ana",
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_team_api() -> Result<()> {
    let server = setup_test_server().await?;
    let library = create_demo_library(&server).await;

    let response = as_user(server.put(&format!("/libraries/v2/{}/team/user/bob/", library)), "ana")
        .json(&json!({"access_level": "read"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = as_user(server.get(&format!("/libraries/v2/{}/", library)), "bob").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let team: Vec<Value> = as_user(server.get(&format!("/libraries/v2/{}/team/", library)), "ana")
        .await
        .json();
    assert_eq!(team.len(), 2);

    // readers may not edit
    let response = as_user(server.post(&format!("/libraries/v2/{}/blocks/", library)), "bob")
        .json(&json!({"block_type": "problem", "definition_id": "q1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response =
        as_user(server.delete(&format!("/libraries/v2/{}/team/user/ana/", library)), "ana").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_library_commit_and_revert() -> Result<()> {
    let server = setup_test_server().await?;
    let library = create_demo_library(&server).await;
    let q1 = create_problem(&server, &library, "q1").await;

    let response = as_user(server.post(&format!("/libraries/v2/{}/commit/", library)), "ana").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["published"], json!([q1.clone()]));

    as_user(server.post(&format!("/libraries/v2/blocks/{}/olx/", q1)), "ana")
        .json(&json!({"olx": "<problem>draft</problem>"}))
        .await;
    let response =
        as_user(server.delete(&format!("/libraries/v2/{}/commit/", library)), "ana").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["reverted"], json!([q1.clone()]));

    let body: Value = as_user(server.get(&format!("/libraries/v2/{}/", library)), "ana")
        .await
        .json();
    assert_eq!(body["has_unpublished_changes"], false);
    Ok(())
}

#[tokio::test]
async fn test_cors_headers() -> Result<()> {
    let server = setup_test_server().await?;

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("http://localhost:3001"),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.headers().get("access-control-allow-origin").is_some());
    Ok(())
}
