mod common;

use common::{course_creator, demo_library, problem, setup_gateway};
use contentlib::events::LibraryEvent;
use contentlib::keys::{ContainerType, OpaqueKey};
use contentlib::services::ChildrenAction;
use tokio::sync::broadcast;

fn drain(receiver: &mut broadcast::Receiver<LibraryEvent>) -> Vec<LibraryEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

fn is_published_event(event: &LibraryEvent) -> bool {
    matches!(
        event,
        LibraryEvent::ComponentPublished { .. } | LibraryEvent::ContainerPublished { .. }
    )
}

#[tokio::test]
async fn test_publishing_deleted_component_announces_nothing() {
    let gateway = setup_gateway().await;
    let ana = course_creator(&gateway, "ana").await;
    let library = demo_library(&gateway, &ana).await;
    let q1 = problem(&gateway, &ana, &library, "q1").await;
    let unit = gateway
        .create_container(&ana, &library, ContainerType::Unit, "Unit", Some("u1"))
        .await
        .unwrap()
        .container_key;
    gateway
        .update_container_children(&ana, &unit, &[q1.clone().into()], ChildrenAction::Append)
        .await
        .unwrap();
    gateway.publish_component(&ana, &q1).await.unwrap();
    gateway.delete_component(&ana, &q1).await.unwrap();

    let mut events = gateway.events().subscribe_all();
    let outcome = gateway.publish_component(&ana, &q1).await.unwrap();
    assert_eq!(outcome.published, vec![OpaqueKey::from(q1.clone())]);
    assert!(outcome.log_id.is_some());

    let received = drain(&mut events);
    assert!(
        !received.iter().any(is_published_event),
        "unexpected events: {:?}",
        received
    );

    // the pending delete is gone from the library state
    let metadata = gateway.get_library(&ana, &library).await.unwrap();
    assert!(!metadata.has_unpublished_deletes);
}

#[tokio::test]
async fn test_container_publish_skips_deleted_children_events() {
    let gateway = setup_gateway().await;
    let ana = course_creator(&gateway, "ana").await;
    let library = demo_library(&gateway, &ana).await;
    let q1 = problem(&gateway, &ana, &library, "q1").await;
    let q2 = problem(&gateway, &ana, &library, "q2").await;
    let unit = gateway
        .create_container(&ana, &library, ContainerType::Unit, "Unit", Some("u1"))
        .await
        .unwrap()
        .container_key;
    gateway
        .update_container_children(
            &ana,
            &unit,
            &[q1.clone().into(), q2.clone().into()],
            ChildrenAction::Append,
        )
        .await
        .unwrap();
    gateway.publish_container_changes(&ana, &unit).await.unwrap();
    gateway.delete_component(&ana, &q2).await.unwrap();
    gateway
        .set_component_payload(&ana, &q1, "<problem>edited</problem>")
        .await
        .unwrap();

    let mut events = gateway.events().subscribe_all();
    let outcome = gateway.publish_container_changes(&ana, &unit).await.unwrap();
    assert!(outcome.published.contains(&OpaqueKey::from(q1.clone())));

    let received = drain(&mut events);
    assert!(received.contains(&LibraryEvent::ComponentPublished { usage_key: q1 }));
    assert!(!received.contains(&LibraryEvent::ComponentPublished { usage_key: q2 }));
}
