// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Command Handlers for the Event and Comment Aggregates
//!
//! Handlers turn validated intent into store instructions:
//!
//! ```text
//! handle(Command) → Result<Fields | AtomicUpdate, CercoError>
//! ```
//!
//! All handlers are **pure functions**:
//! - No I/O and no clock access
//! - Deterministic (same inputs → same output)
//!
//! The invariants that span concurrent callers (no duplicate members,
//! counters equal to list lengths, capacity) are expressed as preconditions
//! and paired operations inside one [`AtomicUpdate`], so the store enforces
//! them against the latest committed document.

use serde_json::{json, Map, Value};

use super::commands::{EventDraft, EventPatch};
use super::fields;
use crate::domain::invariants::*;
use crate::domain::Identity;
use crate::errors::{CercoError, CercoResult};
use crate::store::{AtomicUpdate, Precondition};

/// Build the fields of a new event document
///
/// # Business Rules
/// - Title, description and location are trimmed and required
/// - Date, time and coordinate must parse and be in range
/// - Category must be known; missing means `Other`
/// - Social state starts empty
pub fn handle_create_event(draft: EventDraft, host: &Identity) -> CercoResult<Map<String, Value>> {
    let title = required_text("title", &draft.title)?;
    let description = required_text("description", &draft.description)?;
    let location = required_text("location", &draft.location)?;
    let coordinate = validate_coordinate(draft.coordinate)?;
    let date = validate_date(&draft.date)?;
    let time = validate_time(&draft.time)?;
    let category = validate_category(draft.category.as_deref())?;
    let max_attendees = validate_max_attendees(draft.max_attendees)?;

    let mut document = Map::new();
    let mut put = |field: &str, value: Value| {
        document.insert(field.to_string(), value);
    };
    put(fields::TITLE, json!(title));
    put(fields::DESCRIPTION, json!(description));
    put(fields::LOCATION, json!(location));
    put(fields::COORDINATE, json!(coordinate));
    put(fields::DATE, json!(date.format("%Y-%m-%d").to_string()));
    put(fields::TIME, json!(time));
    put(fields::CATEGORY, json!(category));
    put(fields::MAX_ATTENDEES, json!(max_attendees));
    put(fields::CREATED_BY, json!(host.user_id));
    put(fields::CREATED_BY_NAME, json!(host.name_or_anonymous()));
    put(fields::ATTENDEES, json!(0));
    put(fields::ATTENDEES_LIST, json!([]));
    put(fields::LIKES, json!(0));
    put(fields::LIKES_LIST, json!([]));

    Ok(document)
}

/// Join: user must not attend yet and the event must have room
pub fn handle_join(user_id: &str) -> AtomicUpdate {
    AtomicUpdate::new()
        .require(Precondition::NotContains {
            field: fields::ATTENDEES_LIST.to_string(),
            value: json!(user_id),
        })
        .require(Precondition::BelowLimit {
            counter_field: fields::ATTENDEES.to_string(),
            limit_field: fields::MAX_ATTENDEES.to_string(),
        })
        .add_to_set(fields::ATTENDEES_LIST, json!(user_id))
        .increment(fields::ATTENDEES, 1)
        .touch()
}

/// Leave: user must attend; the counter never drops below zero
pub fn handle_leave(user_id: &str) -> AtomicUpdate {
    AtomicUpdate::new()
        .require(Precondition::Contains {
            field: fields::ATTENDEES_LIST.to_string(),
            value: json!(user_id),
        })
        .remove_from_set(fields::ATTENDEES_LIST, json!(user_id))
        .increment_with_floor(fields::ATTENDEES, -1, 0)
        .touch()
}

/// Like toggle: adds the like if absent, removes it if present
pub fn handle_toggle_like(user_id: &str) -> AtomicUpdate {
    AtomicUpdate::new()
        .toggle_membership(fields::LIKES_LIST, fields::LIKES, json!(user_id))
        .touch()
}

/// Explicit unlike: user must have liked the event
pub fn handle_unlike(user_id: &str) -> AtomicUpdate {
    AtomicUpdate::new()
        .require(Precondition::Contains {
            field: fields::LIKES_LIST.to_string(),
            value: json!(user_id),
        })
        .remove_from_set(fields::LIKES_LIST, json!(user_id))
        .increment_with_floor(fields::LIKES, -1, 0)
        .touch()
}

/// Merge descriptive fields; every patched field is validated like on
/// creation. An empty patch only refreshes `updatedAt`.
pub fn handle_update(patch: EventPatch) -> CercoResult<AtomicUpdate> {
    let mut update = AtomicUpdate::new();

    if let Some(title) = patch.title {
        update = update.set(fields::TITLE, json!(required_text("title", &title)?));
    }
    if let Some(description) = patch.description {
        update = update.set(
            fields::DESCRIPTION,
            json!(required_text("description", &description)?),
        );
    }
    if let Some(location) = patch.location {
        update = update.set(fields::LOCATION, json!(required_text("location", &location)?));
    }
    if let Some(coordinate) = patch.coordinate {
        update = update.set(fields::COORDINATE, json!(validate_coordinate(Some(coordinate))?));
    }
    if let Some(date) = patch.date {
        let date = validate_date(&date)?;
        update = update.set(fields::DATE, json!(date.format("%Y-%m-%d").to_string()));
    }
    if let Some(time) = patch.time {
        update = update.set(fields::TIME, json!(validate_time(&time)?));
    }
    if let Some(category) = patch.category {
        update = update.set(fields::CATEGORY, json!(validate_category(Some(&category))?));
    }
    if let Some(max_attendees) = patch.max_attendees {
        update = update.set(
            fields::MAX_ATTENDEES,
            json!(validate_max_attendees(max_attendees)?),
        );
    }

    Ok(update.touch())
}

/// Build the fields of a new comment document
///
/// # Business Rules
/// - Caller must be authenticated
/// - Text is trimmed, non-empty and at most 500 characters
/// - Author name defaults to `"Anonymous"`
pub fn handle_add_comment(
    event_id: &str,
    author: Option<&Identity>,
    text: &str,
) -> CercoResult<Map<String, Value>> {
    let author =
        author.ok_or_else(|| CercoError::validation("user", "must be signed in to comment"))?;
    let text = validate_comment_text(text)?;

    let mut document = Map::new();
    document.insert(fields::EVENT_ID.to_string(), json!(event_id));
    document.insert(fields::USER_ID.to_string(), json!(author.user_id));
    document.insert(fields::USER_NAME.to_string(), json!(author.name_or_anonymous()));
    document.insert(fields::USER_AVATAR.to_string(), json!(author.avatar_url));
    document.insert(fields::COMMENT.to_string(), json!(text));
    Ok(document)
}

/// Translate a failed join precondition into the domain error
pub fn join_rejection(
    event_id: &str,
    user_id: &str,
    failed: &Precondition,
    max_attendees: Option<u64>,
) -> CercoError {
    match failed {
        Precondition::BelowLimit { .. } => CercoError::CapacityReached {
            event_id: event_id.to_string(),
            max_attendees: max_attendees.unwrap_or(0),
        },
        _ => CercoError::AlreadyMember {
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
        },
    }
}
