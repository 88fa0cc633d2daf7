mod common;

use std::collections::BTreeSet;

use common::{course_creator, setup_gateway, setup_gateway_with, user};
use contentlib::common::pagination::PageRequest;
use contentlib::database::entities::content_libraries;
use contentlib::gateway::{LibraryFilter, LibraryPatch, NewLibrary};
use contentlib::keys::LibraryKey;
use contentlib::services::{AccessLevel, Action, Actor, NewUser};
use contentlib::{LibraryConfig, LibraryError, LibraryGateway};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

async fn library(
    gateway: &LibraryGateway,
    owner: &Actor,
    slug: &str,
    public_read: bool,
    public_learning: bool,
) -> LibraryKey {
    let mut new = NewLibrary::new("Axim", slug, slug);
    new.allow_public_read = public_read;
    new.allow_public_learning = public_learning;
    gateway.create_library(owner, new).await.unwrap().key
}

async fn listed(gateway: &LibraryGateway, actor: &Actor, action: Action) -> BTreeSet<String> {
    gateway
        .list_libraries(actor, action, &LibraryFilter::default(), PageRequest::unpaginated())
        .await
        .unwrap()
        .items
        .into_iter()
        .map(|library| library.key.to_string())
        .collect()
}

async fn checked(
    gateway: &LibraryGateway,
    actor: &Actor,
    action: Action,
    keys: &[LibraryKey],
) -> BTreeSet<String> {
    let mut allowed = BTreeSet::new();
    for key in keys {
        let model = content_libraries::Entity::find()
            .filter(content_libraries::Column::Org.eq(key.org()))
            .filter(content_libraries::Column::Slug.eq(key.slug()))
            .one(gateway.db())
            .await
            .unwrap()
            .unwrap();
        if gateway.permissions().check(actor, action, &model).await.unwrap() {
            allowed.insert(key.to_string());
        }
    }
    allowed
}

#[tokio::test]
async fn test_listing_equals_per_library_checks() {
    let gateway = setup_gateway().await;
    let owner = course_creator(&gateway, "owner").await;
    let keys = vec![
        library(&gateway, &owner, "private", false, false).await,
        library(&gateway, &owner, "readable", true, false).await,
        library(&gateway, &owner, "learnable", false, true).await,
        library(&gateway, &owner, "shared", false, false).await,
    ];
    gateway.users().create_group("reviewers").await.unwrap();
    gateway
        .set_library_group_permissions(&owner, &keys[3], "reviewers", Some(AccessLevel::Read))
        .await
        .unwrap();

    let creator = course_creator(&gateway, "creator").await;
    gateway.users().create_user(NewUser::new("reviewer")).await.unwrap();
    gateway.users().add_group_member("reviewers", "reviewer").await.unwrap();
    let reviewer = gateway.users().resolve_actor(Some("reviewer")).await.unwrap();
    let staff = user(&gateway, NewUser::new("root").staff()).await;
    let plain = user(&gateway, NewUser::new("plain")).await;

    let actors = [owner, creator, reviewer, staff, plain, Actor::Anonymous];
    let actions = [Action::View, Action::Learn, Action::Edit, Action::Delete];
    for actor in &actors {
        for action in actions {
            assert_eq!(
                listed(&gateway, actor, action).await,
                checked(&gateway, actor, action, &keys).await,
                "{:?} {:?}",
                actor,
                action
            );
        }
    }

    let creator_view = listed(&gateway, &actors[1], Action::View).await;
    assert_eq!(creator_view.into_iter().collect::<Vec<_>>(), vec!["lib:Axim:readable"]);
    let reviewer_view = listed(&gateway, &actors[2], Action::View).await;
    assert_eq!(reviewer_view.into_iter().collect::<Vec<_>>(), vec!["lib:Axim:shared"]);
    assert_eq!(listed(&gateway, &actors[3], Action::Delete).await.len(), 4);
    assert!(listed(&gateway, &actors[4], Action::View).await.is_empty());
    let anonymous_learn = listed(&gateway, &actors[5], Action::Learn).await;
    assert_eq!(anonymous_learn.into_iter().collect::<Vec<_>>(), vec!["lib:Axim:learnable"]);
}

#[tokio::test]
async fn test_public_read_for_authors_flag() {
    let config = LibraryConfig {
        public_read_for_authors: true,
        ..Default::default()
    };
    let gateway = setup_gateway_with(config).await;
    let owner = course_creator(&gateway, "owner").await;
    let key = library(&gateway, &owner, "readable", true, false).await;
    let plain = user(&gateway, NewUser::new("plain")).await;

    assert!(gateway.get_library(&plain, &key).await.is_ok());
    let err = gateway
        .update_library(&plain, &key, LibraryPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::PermissionDenied(_)));
}

#[tokio::test]
async fn test_only_creators_create_libraries() {
    let gateway = setup_gateway().await;
    let plain = user(&gateway, NewUser::new("plain")).await;
    let err = gateway
        .create_library(&plain, NewLibrary::new("Axim", "Nope", "Nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::PermissionDenied(_)));

    let staff = user(&gateway, NewUser::new("root").staff()).await;
    assert!(gateway
        .create_library(&staff, NewLibrary::new("Axim", "Yes", "Yes"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_team_management() {
    let gateway = setup_gateway().await;
    let owner = course_creator(&gateway, "owner").await;
    let key = library(&gateway, &owner, "team", false, false).await;
    let bob = user(&gateway, NewUser::new("bob")).await;

    gateway
        .set_library_user_permissions(&owner, &key, "bob", Some(AccessLevel::Author))
        .await
        .unwrap();
    let grant = gateway
        .get_library_user_permissions(&owner, &key, "bob")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.access_level, AccessLevel::Author);

    // authors may edit but not manage the team
    gateway
        .create_component(&bob, &key, "problem", "q1", "<problem/>")
        .await
        .unwrap();
    let err = gateway
        .set_library_user_permissions(&bob, &key, "bob", Some(AccessLevel::Admin))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::PermissionDenied(_)));
    let err = gateway.delete_library(&bob, &key).await.unwrap_err();
    assert!(matches!(err, LibraryError::PermissionDenied(_)));

    let team = gateway.get_library_team(&owner, &key).await.unwrap();
    let names: Vec<_> = team.iter().filter_map(|g| g.username.as_deref()).collect();
    assert_eq!(names, vec!["bob", "owner"]);

    let err = gateway
        .set_library_user_permissions(&owner, &key, "owner", Some(AccessLevel::Read))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Validation(_)));
    let err = gateway
        .set_library_user_permissions(&owner, &key, "owner", None)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Validation(_)));

    gateway
        .set_library_user_permissions(&owner, &key, "bob", Some(AccessLevel::Admin))
        .await
        .unwrap();
    gateway
        .set_library_user_permissions(&owner, &key, "owner", None)
        .await
        .unwrap();
    assert!(gateway
        .get_library_user_permissions(&bob, &key, "owner")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_deleted_library_is_hidden_from_listing() {
    let gateway = setup_gateway().await;
    let owner = course_creator(&gateway, "owner").await;
    let key = library(&gateway, &owner, "gone", false, false).await;

    gateway.delete_library(&owner, &key).await.unwrap();
    assert!(listed(&gateway, &owner, Action::View).await.is_empty());
    assert!(gateway.get_library(&owner, &key).await.unwrap().deleted);
    let err = gateway
        .create_component(&owner, &key, "problem", "q1", "<problem/>")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    gateway.restore_library(&owner, &key).await.unwrap();
    assert_eq!(listed(&gateway, &owner, Action::View).await.len(), 1);
}
