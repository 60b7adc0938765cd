// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure read-model state
//!
//! Snapshots from the store are folded into [`ReadModelState`] by plain
//! functions; the async [`ReadModel`](super::ReadModel) only moves snapshots
//! in and publishes the result.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::{distance_miles, Category, Comment, Coordinate, Event};
use crate::store::Document;

/// Client-side projection of events and their comments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadModelState {
    events: Vec<Event>,
    comments: HashMap<String, Vec<Comment>>,
    last_error: Option<String>,
    version: u64,
}

impl ReadModelState {
    /// Empty state at version 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every event with a fresh snapshot, keeping snapshot order
    pub fn replace_events(&mut self, docs: &[Document]) {
        self.events = decode_all(docs);
        self.version += 1;
    }

    /// Replace every comment with a fresh snapshot, grouped by event
    pub fn replace_comments(&mut self, docs: &[Document]) {
        let mut grouped: HashMap<String, Vec<Comment>> = HashMap::new();
        for comment in decode_all::<Comment>(docs) {
            grouped.entry(comment.event_id.clone()).or_default().push(comment);
        }
        for bucket in grouped.values_mut() {
            bucket.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            });
        }
        self.comments = grouped;
        self.version += 1;
    }

    /// Record a subscription error; projected data is left untouched
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.version += 1;
    }

    /// Rebuild counter, bumped on every applied snapshot or error
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Most recent subscription error, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// All events, newest first
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// One event by id
    pub fn event_by_id(&self, event_id: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.id == event_id)
    }

    /// Events of one category
    pub fn events_by_category(&self, category: Category) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|event| event.category == category)
            .collect()
    }

    /// Events hosted by a user
    pub fn events_by_host(&self, user_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|event| event.created_by == user_id)
            .collect()
    }

    /// Events on a calendar day
    pub fn events_on(&self, date: NaiveDate) -> Vec<&Event> {
        self.events.iter().filter(|event| event.date == date).collect()
    }

    /// Events within `radius_miles` of `origin`, nearest first, with distance
    pub fn events_near(&self, origin: &Coordinate, radius_miles: f64) -> Vec<(&Event, f64)> {
        let mut nearby: Vec<(&Event, f64)> = self
            .events
            .iter()
            .map(|event| (event, distance_miles(origin, &event.coordinate)))
            .filter(|(_, miles)| *miles <= radius_miles)
            .collect();
        nearby.sort_by(|a, b| a.1.total_cmp(&b.1));
        nearby
    }

    /// Comments of a visible event, newest first; orphans yield nothing
    pub fn comments_for(&self, event_id: &str) -> &[Comment] {
        if self.event_by_id(event_id).is_none() {
            return &[];
        }
        self.comments
            .get(event_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn decode_all<T: serde::de::DeserializeOwned>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(document_id = %doc.id, error = %e, "skipping undecodable document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn doc(id: &str, value: Value) -> Document {
        Document::new(id, value.as_object().cloned().unwrap_or_default())
    }

    fn event(id: &str, category: &str, lat: f64, created_at: i64) -> Document {
        doc(
            id,
            json!({
                "title": id,
                "description": "d",
                "location": "l",
                "coordinate": {"latitude": lat, "longitude": -76.48},
                "date": "2026-02-01",
                "time": "19:00",
                "category": category,
                "createdBy": "host",
                "createdByName": "Host",
                "attendees": 0,
                "attendeesList": [],
                "likes": 0,
                "likesList": [],
                "createdAt": created_at,
                "updatedAt": created_at
            }),
        )
    }

    fn comment(id: &str, event_id: &str, created_at: i64) -> Document {
        doc(
            id,
            json!({
                "eventId": event_id,
                "userId": "u1",
                "userName": "Anonymous",
                "comment": "hi",
                "createdAt": created_at,
                "updatedAt": created_at
            }),
        )
    }

    #[test]
    fn test_comments_newest_first() {
        let mut state = ReadModelState::new();
        state.replace_events(&[event("e1", "Social", 42.45, 1)]);
        state.replace_comments(&[comment("c1", "e1", 10), comment("c2", "e1", 30), comment("c3", "e1", 20)]);

        let ids: Vec<&str> = state.comments_for("e1").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c3", "c1"]);
    }

    #[test]
    fn test_orphan_comments_hidden() {
        let mut state = ReadModelState::new();
        state.replace_comments(&[comment("c1", "gone", 10)]);
        assert!(state.comments_for("gone").is_empty());
    }

    #[test]
    fn test_undecodable_event_skipped() {
        let mut state = ReadModelState::new();
        state.replace_events(&[event("e1", "Sports", 42.45, 1), doc("bad", json!({"title": 3}))]);
        assert_eq!(state.events().len(), 1);
        assert_eq!(state.version(), 1);
    }

    #[test]
    fn test_filters() {
        let mut state = ReadModelState::new();
        state.replace_events(&[
            event("e1", "Sports", 42.45, 2),
            event("e2", "Music", 42.46, 1),
        ]);

        assert_eq!(state.events_by_category(Category::Music).len(), 1);
        assert_eq!(state.events_by_host("host").len(), 2);
        assert_eq!(
            state
                .events_on(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap())
                .len(),
            2
        );
        assert!(state.event_by_id("e3").is_none());
    }

    #[test]
    fn test_events_with_unlisted_category_stay_visible() {
        let mut state = ReadModelState::new();
        state.replace_events(&[
            event("e1", "Academic", 42.45, 2),
            event("e2", "Rave", 42.46, 1),
        ]);

        assert_eq!(state.events().len(), 2);
        assert_eq!(state.events_by_category(Category::Academic).len(), 1);
        assert_eq!(state.events_by_category(Category::Other).len(), 1);
    }

    #[test]
    fn test_error_keeps_last_known_good() {
        let mut state = ReadModelState::new();
        state.replace_events(&[event("e1", "Sports", 42.45, 1)]);
        state.record_error("permission denied");

        assert_eq!(state.events().len(), 1);
        assert_eq!(state.last_error(), Some("permission denied"));
        assert_eq!(state.version(), 2);
    }
}
