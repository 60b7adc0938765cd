// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Social State Updates
//!
//! Random sequences of join, leave, like and unlike are folded through the
//! pure handlers and `apply_update`, and compared against a set-based model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

use cerco_events::aggregate::fields;
use cerco_events::aggregate::handlers::{handle_join, handle_leave, handle_toggle_like, handle_unlike};
use cerco_events::store::{apply_update, AtomicUpdate, UPDATED_AT};
use cerco_events::StoreError;

// ============================================================================
// Operations
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Op {
    Join(u8),
    Leave(u8),
    ToggleLike(u8),
    Unlike(u8),
}

impl Op {
    fn update(self) -> AtomicUpdate {
        match self {
            Op::Join(u) => handle_join(&user(u)),
            Op::Leave(u) => handle_leave(&user(u)),
            Op::ToggleLike(u) => handle_toggle_like(&user(u)),
            Op::Unlike(u) => handle_unlike(&user(u)),
        }
    }
}

fn user(n: u8) -> String {
    format!("user-{}", n)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let user = 0u8..6;
    prop_oneof![
        user.clone().prop_map(Op::Join),
        user.clone().prop_map(Op::Leave),
        user.clone().prop_map(Op::ToggleLike),
        user.prop_map(Op::Unlike),
    ]
}

fn new_event(max_attendees: Option<u64>) -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert(fields::TITLE.to_string(), json!("Trivia"));
    doc.insert(fields::MAX_ATTENDEES.to_string(), json!(max_attendees));
    doc.insert(fields::ATTENDEES.to_string(), json!(0));
    doc.insert(fields::ATTENDEES_LIST.to_string(), json!([]));
    doc.insert(fields::LIKES.to_string(), json!(0));
    doc.insert(fields::LIKES_LIST.to_string(), json!([]));
    doc.insert(UPDATED_AT.to_string(), json!(0));
    doc
}

fn list(doc: &Map<String, Value>, field: &str) -> Vec<String> {
    doc.get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn counter(doc: &Map<String, Value>, field: &str) -> u64 {
    doc.get(field).and_then(Value::as_u64).unwrap_or(u64::MAX)
}

fn at(step: usize) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(1_000_000 + step as i64).unwrap_or(DateTime::UNIX_EPOCH)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Counters always equal list lengths and lists never hold duplicates
    #[test]
    fn prop_counters_match_lists(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut doc = new_event(None);

        for (step, op) in ops.into_iter().enumerate() {
            if let Ok(applied) = apply_update(&doc, &op.update(), at(step)) {
                doc = applied.data;
            }

            let attendees = list(&doc, fields::ATTENDEES_LIST);
            let likes = list(&doc, fields::LIKES_LIST);
            prop_assert_eq!(counter(&doc, fields::ATTENDEES), attendees.len() as u64);
            prop_assert_eq!(counter(&doc, fields::LIKES), likes.len() as u64);
            prop_assert_eq!(attendees.iter().collect::<BTreeSet<_>>().len(), attendees.len());
            prop_assert_eq!(likes.iter().collect::<BTreeSet<_>>().len(), likes.len());
        }
    }

    /// The attendee list behaves like a set model; rejected updates change nothing
    #[test]
    fn prop_matches_set_model(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut doc = new_event(None);
        let mut attending: BTreeSet<String> = BTreeSet::new();
        let mut liking: BTreeSet<String> = BTreeSet::new();

        for (step, op) in ops.into_iter().enumerate() {
            let result = apply_update(&doc, &op.update(), at(step));

            let expected_ok = match op {
                Op::Join(u) => attending.insert(user(u)),
                Op::Leave(u) => attending.remove(&user(u)),
                Op::ToggleLike(u) => {
                    if !liking.remove(&user(u)) {
                        liking.insert(user(u));
                    }
                    true
                }
                Op::Unlike(u) => liking.remove(&user(u)),
            };

            match result {
                Ok(applied) => {
                    prop_assert!(expected_ok);
                    doc = applied.data;
                }
                Err(StoreError::PreconditionFailed(_)) => prop_assert!(!expected_ok),
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }

            let attendees: BTreeSet<String> = list(&doc, fields::ATTENDEES_LIST).into_iter().collect();
            let likes: BTreeSet<String> = list(&doc, fields::LIKES_LIST).into_iter().collect();
            prop_assert_eq!(&attendees, &attending);
            prop_assert_eq!(&likes, &liking);
        }
    }

    /// Capacity is never exceeded
    #[test]
    fn prop_capacity_never_exceeded(
        max in 1u64..4,
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let mut doc = new_event(Some(max));

        for (step, op) in ops.into_iter().enumerate() {
            if let Ok(applied) = apply_update(&doc, &op.update(), at(step)) {
                doc = applied.data;
            }
            prop_assert!(counter(&doc, fields::ATTENDEES) <= max);
        }
    }

    /// Successful updates never move updatedAt backwards
    #[test]
    fn prop_updated_at_monotonic(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut doc = new_event(None);
        let mut last = 0i64;

        for (step, op) in ops.into_iter().enumerate() {
            if let Ok(applied) = apply_update(&doc, &op.update(), at(step)) {
                doc = applied.data;
            }
            let updated = doc.get(UPDATED_AT).and_then(Value::as_i64).unwrap_or(0);
            prop_assert!(updated >= last);
            last = updated;
        }
    }
}
