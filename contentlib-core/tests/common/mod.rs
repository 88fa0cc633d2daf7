#![allow(dead_code)]

use contentlib::database::migrations::Migrator;
use contentlib::gateway::NewLibrary;
use contentlib::keys::{LibraryKey, UsageKey};
use contentlib::services::{Actor, NewUser};
use contentlib::{LibraryConfig, LibraryGateway};
use contentlib_test_utils::TestDb;
use sea_orm_migration::MigratorTrait;

pub async fn setup_gateway() -> LibraryGateway {
    setup_gateway_with(LibraryConfig::default()).await
}

pub async fn setup_gateway_with(config: LibraryConfig) -> LibraryGateway {
    let db = TestDb::new_in_memory().connect().await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    LibraryGateway::new(db, config)
}

/// Create a user and return it as an acting principal.
pub async fn user(gateway: &LibraryGateway, new_user: NewUser) -> Actor {
    let username = new_user.username.clone();
    gateway.users().create_user(new_user).await.unwrap();
    gateway.users().resolve_actor(Some(&username)).await.unwrap()
}

pub async fn course_creator(gateway: &LibraryGateway, username: &str) -> Actor {
    user(gateway, NewUser::new(username).course_creator()).await
}

pub async fn demo_library(gateway: &LibraryGateway, owner: &Actor) -> LibraryKey {
    gateway
        .create_library(owner, NewLibrary::new("Axim", "Demo", "Demo Library"))
        .await
        .unwrap()
        .key
}

pub async fn problem(
    gateway: &LibraryGateway,
    owner: &Actor,
    library: &LibraryKey,
    local_id: &str,
) -> UsageKey {
    gateway
        .create_component(owner, library, "problem", local_id, "<problem/>")
        .await
        .unwrap()
        .usage_key
}
