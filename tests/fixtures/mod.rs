// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cerco-events
//!
//! Deterministic identities, drafts and clocks shared by the integration
//! tests. Stores built here use a [`ManualClock`] pinned to
//! [`FIXED_TIMESTAMP`] so stamped times are reproducible.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use cerco_events::aggregate::commands::EventDraft;
use cerco_events::domain::{Coordinate, Identity};
use cerco_events::store::{Collection, DocumentStore, InMemoryDocumentStore};
use cerco_events::ManualClock;

/// Fixed test timestamp
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

/// Campus quad, used as the map origin
pub const QUAD: Coordinate = Coordinate {
    latitude: 42.4475,
    longitude: -76.4813,
};

/// Parse the fixed timestamp
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

/// Clock pinned to the fixed timestamp
pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(fixed_timestamp()))
}

/// In-memory store driven by `clock`
pub fn store_with(clock: Arc<ManualClock>) -> InMemoryDocumentStore {
    InMemoryDocumentStore::with_clock(clock)
}

/// Host identity
pub fn host() -> Identity {
    Identity::new("host-1")
        .with_display_name("Ana Host")
        .with_email("ana@campus.edu")
}

/// Student identity numbered `n`
pub fn student(n: usize) -> Identity {
    Identity::new(format!("student-{}", n)).with_display_name(format!("Student {}", n))
}

/// Valid draft for an event on `date`
pub fn draft_on(date: &str) -> EventDraft {
    EventDraft::new("Board game night", "Bring your favourite game", "Student union, room 4")
        .at(QUAD)
        .on(date, "19:30")
        .category("Social")
}

/// Valid draft dated after the fixed timestamp
pub fn draft() -> EventDraft {
    draft_on("2026-02-01")
}

/// Seed a user profile document
pub async fn seed_user(store: &dyn DocumentStore, id: &str, notifications_enabled: bool) {
    let data = json!({
        "name": id,
        "notificationsEnabled": notifications_enabled,
        "eventsHosted": 0,
        "eventsAttended": 0
    });
    store
        .create_with_id(
            Collection::Users,
            id,
            data.as_object().cloned().expect("user fixture is an object"),
        )
        .await
        .expect("failed to seed user");
}
