mod common;

use common::{course_creator, problem, setup_gateway};
use contentlib::common::pagination::PageRequest;
use contentlib::gateway::{LibraryFilter, LibraryMetadata, NewLibrary};
use contentlib::services::{AccessLevel, Action};

fn summary(metadata: &LibraryMetadata) -> (String, u64, bool, bool, Option<String>, bool) {
    (
        metadata.key.to_string(),
        metadata.num_blocks,
        metadata.has_unpublished_changes,
        metadata.has_unpublished_deletes,
        metadata.published_by.clone(),
        metadata.last_published.is_some(),
    )
}

#[tokio::test]
async fn test_listing_reports_each_library_state() {
    let gateway = setup_gateway().await;
    let ana = course_creator(&gateway, "ana").await;

    let mut keys = Vec::new();
    for slug in ["Clean", "Dirty", "Empty", "PendingDelete"] {
        let key = gateway
            .create_library(&ana, NewLibrary::new("Axim", slug, slug))
            .await
            .unwrap()
            .key;
        keys.push(key);
    }
    let (clean, dirty, pending_delete) = (&keys[0], &keys[1], &keys[3]);

    for local_id in ["q1", "q2"] {
        problem(&gateway, &ana, clean, local_id).await;
    }
    gateway.publish_changes(&ana, clean).await.unwrap();

    let edited = problem(&gateway, &ana, dirty, "q1").await;
    gateway.publish_changes(&ana, dirty).await.unwrap();
    gateway
        .set_component_payload(&ana, &edited, "<problem>v2</problem>")
        .await
        .unwrap();
    problem(&gateway, &ana, dirty, "q2").await;

    let doomed = problem(&gateway, &ana, pending_delete, "q1").await;
    gateway.publish_changes(&ana, pending_delete).await.unwrap();
    gateway.delete_component(&ana, &doomed).await.unwrap();

    let listed = gateway
        .list_libraries(&ana, Action::View, &LibraryFilter::default(), PageRequest::new(1, 3))
        .await
        .unwrap();
    assert_eq!(listed.total, 4);
    assert_eq!(listed.items.len(), 3);

    let everything = gateway
        .list_libraries(&ana, Action::View, &LibraryFilter::default(), PageRequest::unpaginated())
        .await
        .unwrap();
    let listed: Vec<_> = everything.items.iter().map(summary).collect();
    assert_eq!(
        listed,
        vec![
            ("lib:Axim:Clean".to_string(), 2, false, false, Some("ana".to_string()), true),
            ("lib:Axim:Dirty".to_string(), 2, true, false, Some("ana".to_string()), true),
            ("lib:Axim:Empty".to_string(), 0, false, false, None, false),
            ("lib:Axim:PendingDelete".to_string(), 0, false, true, Some("ana".to_string()), true),
        ]
    );

    // the listing agrees with the single-library view
    for (key, from_list) in keys.iter().zip(&everything.items) {
        let single = gateway.get_library(&ana, key).await.unwrap();
        assert_eq!(summary(&single), summary(from_list));
        assert_eq!(single.last_published, from_list.last_published);
    }
}

#[tokio::test]
async fn test_listing_uses_latest_publish_per_library() {
    let gateway = setup_gateway().await;
    let ana = course_creator(&gateway, "ana").await;
    let bob = course_creator(&gateway, "bob").await;
    let key = gateway
        .create_library(&ana, NewLibrary::new("Axim", "Shared", "Shared"))
        .await
        .unwrap()
        .key;
    gateway
        .set_library_user_permissions(&ana, &key, "bob", Some(AccessLevel::Author))
        .await
        .unwrap();

    let q1 = problem(&gateway, &ana, &key, "q1").await;
    gateway.publish_changes(&ana, &key).await.unwrap();
    gateway
        .set_component_payload(&bob, &q1, "<problem>v2</problem>")
        .await
        .unwrap();
    gateway.publish_changes(&bob, &key).await.unwrap();

    let listed = gateway
        .list_libraries(&ana, Action::View, &LibraryFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.items[0].published_by.as_deref(), Some("bob"));
    assert!(!listed.items[0].has_unpublished_changes);
}
