// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration tests for the event aggregate
//!
//! These tests drive the event service against the in-memory store and
//! verify the social-state invariants:
//! 1. `attendees == len(attendeesList)` and `likes == len(likesList)`
//! 2. No duplicate members
//! 3. Concurrent joins never lose an update

mod fixtures;

use std::sync::Arc;

use fixtures::*;
use pretty_assertions::assert_eq;
use test_case::test_case;

use cerco_events::aggregate::commands::EventPatch;
use cerco_events::domain::{Category, Identity};
use cerco_events::service::{EventAggregateService, EventService, LikeOutcome};
use cerco_events::store::{Collection, DocumentStore};
use cerco_events::{CercoError, EntityKind};

fn service() -> (EventAggregateService, Arc<dyn DocumentStore>) {
    let store: Arc<dyn DocumentStore> = Arc::new(store_with(fixed_clock()));
    (EventAggregateService::new(store.clone()), store)
}

/// Test: create stamps server time and initialises social state
#[tokio::test]
async fn test_create_event() {
    let (service, _) = service();

    let id = service.create_event(&host(), draft()).await.unwrap();
    let event = service.get_event(&id).await.unwrap();

    assert_eq!(event.title, "Board game night");
    assert_eq!(event.category, Category::Social);
    assert_eq!(event.created_by, "host-1");
    assert_eq!(event.created_by_name, "Ana Host");
    assert_eq!(event.attendees, 0);
    assert!(event.attendees_list.is_empty());
    assert_eq!(event.created_at, fixed_timestamp());
    assert_eq!(event.updated_at, fixed_timestamp());
}

/// Test: a missing description is rejected with a message naming it
#[tokio::test]
async fn test_missing_description_is_rejected() {
    let (service, store) = service();
    let mut draft = draft();
    draft.description = String::new();

    let err = service.create_event(&host(), draft).await.unwrap_err();

    assert_eq!(err.user_message(), "description is required");
    assert!(store
        .query(&cerco_events::store::Query::collection(Collection::Events))
        .await
        .unwrap()
        .is_empty());
}

/// Test: unknown category is a validation error, missing category is Other
#[tokio::test]
async fn test_category_rules() {
    let (service, _) = service();

    let err = service
        .create_event(&host(), draft().category("Karaoke"))
        .await
        .unwrap_err();
    assert!(matches!(err, CercoError::Validation { ref field, .. } if field == "category"));

    let mut uncategorised = draft();
    uncategorised.category = None;
    let id = service.create_event(&host(), uncategorised).await.unwrap();
    assert_eq!(service.get_event(&id).await.unwrap().category, Category::Other);
}

/// Test: every category offered on the create screen is accepted
#[test_case("Sports", Category::Sports)]
#[test_case("Academic", Category::Academic)]
#[test_case("Social", Category::Social)]
#[test_case("Wellness", Category::Wellness)]
#[test_case("Arts", Category::Arts)]
#[test_case("Technology", Category::Technology)]
#[test_case("Food", Category::Food)]
#[test_case("Other", Category::Other)]
#[tokio::test]
async fn test_offered_categories_are_accepted(name: &str, expected: Category) {
    let (service, _) = service();
    let id = service
        .create_event(&host(), draft().category(name))
        .await
        .unwrap();
    assert_eq!(service.get_event(&id).await.unwrap().category, expected);
}

/// Test: joining twice fails and leaves the state unchanged
#[tokio::test]
async fn test_join_is_idempotent_for_state() {
    let (service, _) = service();
    let id = service.create_event(&host(), draft()).await.unwrap();
    let alice = student(1);

    service.join_event(&id, &alice).await.unwrap();
    let before = service.get_event(&id).await.unwrap();

    let err = service.join_event(&id, &alice).await.unwrap_err();
    assert!(matches!(err, CercoError::AlreadyMember { .. }));

    let after = service.get_event(&id).await.unwrap();
    assert_eq!(after.attendees, 1);
    assert_eq!(after.attendees_list, vec!["student-1".to_string()]);
    assert_eq!(after.updated_at, before.updated_at);
}

/// Test: join followed by leave restores the attendee state
#[tokio::test]
async fn test_join_leave_round_trip() {
    let (service, _) = service();
    let id = service.create_event(&host(), draft()).await.unwrap();
    let original = service.get_event(&id).await.unwrap();

    service.join_event(&id, &student(1)).await.unwrap();
    let left = service.leave_event(&id, &student(1)).await.unwrap();

    assert_eq!(left.attendees, original.attendees);
    assert_eq!(left.attendees_list, original.attendees_list);
    assert!(left.counters_consistent());
}

/// Test: leaving an event the user never joined
#[tokio::test]
async fn test_leave_without_join_is_not_member() {
    let (service, _) = service();
    let id = service.create_event(&host(), draft()).await.unwrap();

    let err = service.leave_event(&id, &student(1)).await.unwrap_err();

    assert_eq!(
        err,
        CercoError::NotMember {
            event_id: id.clone(),
            user_id: "student-1".into()
        }
    );
    assert_eq!(service.get_event(&id).await.unwrap().attendees, 0);
}

/// Test: concurrent joins from distinct users are all counted once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_lose_nothing() {
    let (service, _) = service();
    let id = service.create_event(&host(), draft()).await.unwrap();

    let handles: Vec<_> = (0..25)
        .map(|n| {
            let service = service.clone();
            let id = id.clone();
            tokio::spawn(async move { service.join_event(&id, &student(n)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let event = service.get_event(&id).await.unwrap();
    assert_eq!(event.attendees, 25);
    assert_eq!(event.attendees_list.len(), 25);
    assert!(event.counters_consistent());
}

/// Test: concurrent duplicate joins from one user succeed exactly once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_joins() {
    let (service, _) = service();
    let id = service.create_event(&host(), draft()).await.unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let service = service.clone();
            let id = id.clone();
            tokio::spawn(async move { service.join_event(&id, &student(7)).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(service.get_event(&id).await.unwrap().attendees, 1);
}

/// Test: capacity is enforced and reported with the limit
#[tokio::test]
async fn test_capacity_is_enforced() {
    let (service, _) = service();
    let id = service
        .create_event(&host(), draft().max_attendees(2))
        .await
        .unwrap();

    service.join_event(&id, &student(1)).await.unwrap();
    service.join_event(&id, &student(2)).await.unwrap();
    let err = service.join_event(&id, &student(3)).await.unwrap_err();

    assert_eq!(
        err,
        CercoError::CapacityReached {
            event_id: id.clone(),
            max_attendees: 2
        }
    );
    assert!(service.get_event(&id).await.unwrap().is_full());
}

/// Test: like toggling keeps the counter equal to the list length
#[tokio::test]
async fn test_like_toggle_keeps_counters_consistent() {
    let (service, _) = service();
    let id = service.create_event(&host(), draft()).await.unwrap();

    assert_eq!(service.like_event(&id, &student(1)).await.unwrap(), LikeOutcome::Liked);
    assert_eq!(service.like_event(&id, &student(2)).await.unwrap(), LikeOutcome::Liked);
    assert_eq!(service.like_event(&id, &student(1)).await.unwrap(), LikeOutcome::Unliked);

    let event = service.get_event(&id).await.unwrap();
    assert_eq!(event.likes, 1);
    assert!(event.is_liked_by("student-2"));
    assert!(event.counters_consistent());
}

/// Test: updates merge fields and keep social state
#[tokio::test]
async fn test_update_merges_fields() {
    let (service, _) = service();
    let id = service.create_event(&host(), draft()).await.unwrap();
    service.join_event(&id, &student(1)).await.unwrap();

    let event = service
        .update_event(&id, EventPatch::new().title("Board game marathon").category("Study"))
        .await
        .unwrap();

    assert_eq!(event.title, "Board game marathon");
    assert_eq!(event.category, Category::Study);
    assert_eq!(event.description, "Bring your favourite game");
    assert_eq!(event.attendees, 1);
}

/// Test: operations on a deleted event report NotFound
#[tokio::test]
async fn test_deleted_event_is_not_found() {
    let (service, _) = service();
    let id = service.create_event(&host(), draft()).await.unwrap();
    service.delete_event(&id).await.unwrap();

    let err = service
        .join_event(&id, &Identity::new("late"))
        .await
        .unwrap_err();
    assert_eq!(err, CercoError::not_found(EntityKind::Event, id.clone()));
    assert_eq!(err.user_message(), "This event no longer exists");
}
