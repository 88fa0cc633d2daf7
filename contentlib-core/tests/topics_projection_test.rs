mod common;

use std::time::Duration;

use common::setup_gateway;
use contentlib::events::{LibraryEvent, TopicProjector};
use contentlib::keys::CourseKey;
use contentlib::services::{DiscussionConfigPatch, TopicContext};
use contentlib_test_utils::fixtures::unit_context;

fn course() -> CourseKey {
    "course-v1:Axim+Demo+2025".parse().unwrap()
}

fn contexts(units: &[(&str, &str)]) -> Vec<TopicContext> {
    let course = course();
    let mut contexts = vec![TopicContext::general("General", 0)];
    for (ordering, (block_id, title)) in units.iter().enumerate() {
        contexts.push(TopicContext::unit(
            course.make_usage_key("vertical", block_id).unwrap(),
            *title,
            ordering as i32,
            unit_context("Week 1", "Lesson 1", title),
        ));
    }
    contexts
}

#[tokio::test]
async fn test_projection_is_idempotent() {
    let gateway = setup_gateway().await;
    let topics = gateway.topics();
    let course = course();
    let inputs = contexts(&[("u1", "Intro"), ("u2", "Practice")]);

    let first = topics.update_course_discussion_config(&course, &inputs, "legacy").await.unwrap();
    assert_eq!(first.created, 3);
    let rows = topics.list_topic_links(&course, "legacy").await.unwrap();
    let orderings: Vec<i32> = rows.iter().map(|row| row.ordering).collect();
    assert_eq!(orderings, vec![0, 100, 101]);

    let second = topics.update_course_discussion_config(&course, &inputs, "legacy").await.unwrap();
    assert_eq!((second.created, second.updated, second.disabled), (0, 0, 0));
    assert_eq!(topics.list_topic_links(&course, "legacy").await.unwrap(), rows);

    let config = topics.get_discussion_config(&course).await.unwrap();
    assert_eq!(config.provider_id, "legacy");
    assert!(config.enabled);
}

#[tokio::test]
async fn test_removed_units_are_disabled_with_breadcrumb_title() {
    let gateway = setup_gateway().await;
    let topics = gateway.topics();
    let course = course();

    topics
        .update_course_discussion_config(
            &course,
            &contexts(&[("u1", "Intro"), ("u2", "Practice")]),
            "legacy",
        )
        .await
        .unwrap();
    let summary = topics
        .update_course_discussion_config(&course, &contexts(&[("u1", "Intro")]), "legacy")
        .await
        .unwrap();
    assert_eq!(summary.disabled, 1);

    let rows = topics.list_topic_links(&course, "legacy").await.unwrap();
    let disabled: Vec<_> = rows.iter().filter(|row| !row.enabled_in_context).collect();
    assert_eq!(disabled.len(), 1);
    assert_eq!(disabled[0].title, "Week 1|Lesson 1|Practice");

    // bringing the unit back re-enables the same row
    let summary = topics
        .update_course_discussion_config(
            &course,
            &contexts(&[("u1", "Intro"), ("u2", "Practice")]),
            "legacy",
        )
        .await
        .unwrap();
    assert_eq!(summary.created, 0);
    let rows_after = topics.list_topic_links(&course, "legacy").await.unwrap();
    assert!(rows_after.iter().all(|row| row.enabled_in_context));
    assert_eq!(rows_after.len(), rows.len());
}

#[tokio::test]
async fn test_discussion_config_patch() {
    let gateway = setup_gateway().await;
    let course = course();
    let updated = gateway
        .topics()
        .update_discussion_config(
            &course,
            DiscussionConfigPatch {
                provider_id: Some("openedx".to_string()),
                enable_graded_units: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.provider_id, "openedx");
    assert!(updated.enable_graded_units);
    assert_eq!(gateway.topics().get_discussion_config(&course).await.unwrap(), updated);
}

#[tokio::test]
async fn test_projector_consumes_course_events() {
    let gateway = setup_gateway().await;
    let handle = TopicProjector::spawn(gateway.events(), gateway.topics().as_ref().clone());
    let course = course();

    gateway
        .events()
        .publish(LibraryEvent::CourseDiscussionsChanged {
            course_key: course.clone(),
            provider_id: "legacy".to_string(),
            contexts: contexts(&[("u1", "Intro")]),
        })
        .await;

    let mut rows = Vec::new();
    for _ in 0..50 {
        rows = gateway.topics().list_topic_links(&course, "legacy").await.unwrap();
        if rows.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(rows.len(), 2);
    handle.abort();
}
