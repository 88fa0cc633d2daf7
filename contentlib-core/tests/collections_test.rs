mod common;

use common::{course_creator, problem, setup_gateway};
use contentlib::gateway::{CollectionPatch, NewLibrary};
use contentlib::keys::{CollectionKey, OpaqueKey};
use contentlib::LibraryError;

#[tokio::test]
async fn test_collection_crud_and_membership() {
    let gateway = setup_gateway().await;
    let ana = course_creator(&gateway, "ana").await;
    let library = gateway
        .create_library(&ana, NewLibrary::new("Axim", "Demo", "Demo"))
        .await
        .unwrap()
        .key;
    let q1 = problem(&gateway, &ana, &library, "q1").await;
    let q2 = problem(&gateway, &ana, &library, "q2").await;

    let favorites = gateway
        .create_collection(&ana, &library, "favorites", "Favorites", "")
        .await
        .unwrap();
    assert_eq!(favorites.key.to_string(), "lib-collection:Axim:Demo:favorites");
    gateway
        .create_collection(&ana, &library, "hard", "Hard ones", "")
        .await
        .unwrap();
    let err = gateway
        .create_collection(&ana, &library, "hard", "Duplicate", "")
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::AlreadyExists(_)));

    let updated = gateway
        .update_collection(
            &ana,
            &library,
            "hard",
            CollectionPatch {
                description: Some("Tricky problems".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Hard ones");
    assert_eq!(updated.description, "Tricky problems");

    let both: Vec<CollectionKey> = vec![
        library.collection_key("favorites").unwrap(),
        library.collection_key("hard").unwrap(),
    ];
    let current = gateway
        .set_entity_collections(&ana, &q1.clone().into(), &both)
        .await
        .unwrap();
    assert_eq!(current.len(), 2);
    let current = gateway
        .set_entity_collections(&ana, &q1.clone().into(), &both[1..])
        .await
        .unwrap();
    assert_eq!(current, vec![library.collection_key("hard").unwrap()]);

    let with_items = gateway
        .update_collection_items(
            &ana,
            &library,
            "favorites",
            &[q1.clone().into(), q2.clone().into()],
            false,
        )
        .await
        .unwrap();
    let members = with_items.entity_keys.unwrap();
    assert_eq!(members.len(), 2);
    let after_remove = gateway
        .update_collection_items(&ana, &library, "favorites", &[q2.clone().into()], true)
        .await
        .unwrap();
    assert_eq!(after_remove.entity_keys.unwrap(), vec![OpaqueKey::Component(q1.clone())]);

    let component = gateway.get_component(&ana, &q1, true).await.unwrap();
    assert_eq!(component.collections.unwrap().len(), 2);
    assert_eq!(gateway.list_collections(&ana, &library).await.unwrap().len(), 2);

    let err = gateway.delete_collection(&ana, &library, "hard").await.unwrap_err();
    assert!(matches!(err, LibraryError::Validation(_)));
}

#[tokio::test]
async fn test_cross_library_membership_is_rejected() {
    let gateway = setup_gateway().await;
    let ana = course_creator(&gateway, "ana").await;
    let demo = gateway
        .create_library(&ana, NewLibrary::new("Axim", "Demo", "Demo"))
        .await
        .unwrap()
        .key;
    let other = gateway
        .create_library(&ana, NewLibrary::new("Axim", "Other", "Other"))
        .await
        .unwrap()
        .key;
    let q1 = problem(&gateway, &ana, &demo, "q1").await;
    let foreign_q = problem(&gateway, &ana, &other, "q9").await;
    gateway
        .create_collection(&ana, &other, "elsewhere", "Elsewhere", "")
        .await
        .unwrap();
    gateway
        .create_collection(&ana, &demo, "local", "Local", "")
        .await
        .unwrap();

    let err = gateway
        .set_entity_collections(
            &ana,
            &q1.clone().into(),
            &[other.collection_key("elsewhere").unwrap()],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::InvalidScope(_)));

    let err = gateway
        .update_collection_items(&ana, &demo, "local", &[foreign_q.into()], false)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::InvalidScope(_)));

    let err = gateway
        .set_entity_collections(
            &ana,
            &q1.clone().into(),
            &[demo.collection_key("missing").unwrap()],
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // every membership stays within the entity's library
    let memberships = gateway.get_component(&ana, &q1, true).await.unwrap().collections.unwrap();
    assert!(memberships.iter().all(|key| key.library_key() == &demo));
}

#[tokio::test]
async fn test_collection_events_follow_commit() {
    let gateway = setup_gateway().await;
    let ana = course_creator(&gateway, "ana").await;
    let library = gateway
        .create_library(&ana, NewLibrary::new("Axim", "Demo", "Demo"))
        .await
        .unwrap()
        .key;
    let q1 = problem(&gateway, &ana, &library, "q1").await;
    gateway
        .create_collection(&ana, &library, "favorites", "Favorites", "")
        .await
        .unwrap();

    let mut events = gateway.events().subscribe_all();
    gateway
        .set_entity_collections(
            &ana,
            &q1.clone().into(),
            &[library.collection_key("favorites").unwrap()],
        )
        .await
        .unwrap();
    assert_eq!(events.recv().await.unwrap().event_type(), "entity_collections_changed");
    assert_eq!(events.recv().await.unwrap().event_type(), "collection_updated");

    // an unchanged membership set emits nothing
    gateway
        .set_entity_collections(
            &ana,
            &q1.clone().into(),
            &[library.collection_key("favorites").unwrap()],
        )
        .await
        .unwrap();
    assert!(events.try_recv().is_err());
}
