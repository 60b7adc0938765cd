// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration tests for comments: validation, authorship and ordering

mod fixtures;

use std::sync::Arc;

use chrono::Duration;
use fixtures::*;
use pretty_assertions::assert_eq;
use test_case::test_case;

use cerco_events::domain::{relative_age, Identity, MAX_COMMENT_CHARS};
use cerco_events::service::{
    CommentAggregateService, CommentService, EventAggregateService, EventService,
};
use cerco_events::store::DocumentStore;
use cerco_events::CercoError;

struct Harness {
    clock: Arc<cerco_events::ManualClock>,
    events: EventAggregateService,
    comments: CommentAggregateService,
}

fn harness() -> Harness {
    let clock = fixed_clock();
    let store: Arc<dyn DocumentStore> = Arc::new(store_with(clock.clone()));
    Harness {
        clock,
        events: EventAggregateService::new(store.clone()),
        comments: CommentAggregateService::new(store),
    }
}

#[test_case("" ; "empty")]
#[test_case("   \n\t" ; "whitespace only")]
#[tokio::test]
async fn test_blank_comment_rejected(text: &str) {
    let h = harness();
    let id = h.events.create_event(&host(), draft()).await.unwrap();

    let err = h
        .comments
        .add_comment(&id, Some(&student(1)), text)
        .await
        .unwrap_err();

    assert_eq!(err, CercoError::validation("comment", "is required"));
    assert!(h.comments.list_comments(&id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_length_limit_counts_characters() {
    let h = harness();
    let id = h.events.create_event(&host(), draft()).await.unwrap();

    let at_limit = "é".repeat(MAX_COMMENT_CHARS);
    h.comments
        .add_comment(&id, Some(&student(1)), &at_limit)
        .await
        .unwrap();

    let over = "a".repeat(MAX_COMMENT_CHARS + 1);
    let err = h
        .comments
        .add_comment(&id, Some(&student(1)), &over)
        .await
        .unwrap_err();
    assert!(matches!(err, CercoError::Validation { ref field, .. } if field == "comment"));
}

#[tokio::test]
async fn test_unauthenticated_comment_rejected() {
    let h = harness();
    let id = h.events.create_event(&host(), draft()).await.unwrap();

    let err = h.comments.add_comment(&id, None, "hello").await.unwrap_err();
    assert!(matches!(err, CercoError::Validation { .. }));
}

#[tokio::test]
async fn test_comments_listed_newest_first() {
    let h = harness();
    let id = h.events.create_event(&host(), draft()).await.unwrap();

    for text in ["first", "second", "third"] {
        h.comments
            .add_comment(&id, Some(&student(1)), text)
            .await
            .unwrap();
        h.clock.advance(Duration::minutes(5));
    }

    let texts: Vec<String> = h
        .comments
        .list_comments(&id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.comment)
        .collect();
    assert_eq!(texts, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn test_comment_carries_author_details() {
    let h = harness();
    let id = h.events.create_event(&host(), draft()).await.unwrap();
    let author = Identity::new("u-9").with_avatar("https://cdn.campus.edu/u-9.png");

    let comment = h
        .comments
        .add_comment(&id, Some(&author), "  see you there  ")
        .await
        .unwrap();

    assert_eq!(comment.comment, "see you there");
    assert_eq!(comment.user_name, "Anonymous");
    assert_eq!(comment.user_avatar.as_deref(), Some("https://cdn.campus.edu/u-9.png"));
    assert_eq!(comment.event_id, id);

    h.clock.advance(Duration::hours(3));
    assert_eq!(relative_age(comment.created_at, h.clock_now()), "3h ago");
}

#[tokio::test]
async fn test_deleting_event_leaves_comments() {
    let h = harness();
    let id = h.events.create_event(&host(), draft()).await.unwrap();
    h.comments
        .add_comment(&id, Some(&student(1)), "will it rain?")
        .await
        .unwrap();

    h.events.delete_event(&id).await.unwrap();

    assert_eq!(h.comments.list_comments(&id).await.unwrap().len(), 1);
}

impl Harness {
    fn clock_now(&self) -> chrono::DateTime<chrono::Utc> {
        use cerco_events::Clock;
        self.clock.now()
    }
}
