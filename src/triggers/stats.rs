// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Stat Projection
//!
//! Maps committed event changes to user-statistics effects. Effects are
//! returned as data, never performed here; the
//! [`SideEffectLog`](super::side_effects::SideEffectLog) records them and an
//! executor applies them.
//!
//! ```text
//! DocumentChange ──project_change()──▶ Vec<StatEffect> ──▶ SideEffectLog
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregate::fields;
use crate::store::{ChangeKind, Document, DocumentChange, UPDATED_AT};

/// Eventually consistent statistic update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatEffect {
    /// Host created an event
    IncrementHosted {
        /// Host user id
        user_id: String,
        /// Created event
        event_id: String,
        /// Creation time of the event
        at: DateTime<Utc>,
    },

    /// User joined an event
    IncrementAttended {
        /// Joining user id
        user_id: String,
        /// Joined event
        event_id: String,
        /// Time of the update that added the user
        at: DateTime<Utc>,
    },
}

impl StatEffect {
    /// User whose statistics change
    pub fn user_id(&self) -> &str {
        match self {
            StatEffect::IncrementHosted { user_id, .. } => user_id,
            StatEffect::IncrementAttended { user_id, .. } => user_id,
        }
    }
}

/// Stat effects implied by one event change
pub fn project_change(change: &DocumentChange) -> Vec<StatEffect> {
    match (change.kind, &change.before, &change.after) {
        (ChangeKind::Created, _, Some(after)) => host_of(after)
            .map(|user_id| StatEffect::IncrementHosted {
                user_id,
                event_id: change.id.clone(),
                at: micros_field(after, crate::store::CREATED_AT),
            })
            .into_iter()
            .collect(),
        (ChangeKind::Updated, Some(before), Some(after)) => {
            let at = micros_field(after, UPDATED_AT);
            newly_attending(&attendees_of(before), &attendees_of(after))
                .into_iter()
                .map(|user_id| StatEffect::IncrementAttended {
                    user_id,
                    event_id: change.id.clone(),
                    at,
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Users present in `after` but not in `before`, in `after` order
pub fn newly_attending(before: &[String], after: &[String]) -> Vec<String> {
    after
        .iter()
        .filter(|user| !before.contains(user))
        .cloned()
        .collect()
}

fn host_of(doc: &Document) -> Option<String> {
    doc.field(fields::CREATED_BY)
        .and_then(Value::as_str)
        .filter(|host| !host.is_empty())
        .map(String::from)
}

fn attendees_of(doc: &Document) -> Vec<String> {
    doc.field(fields::ATTENDEES_LIST)
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn micros_field(doc: &Document, field: &str) -> DateTime<Utc> {
    doc.field(field)
        .and_then(Value::as_i64)
        .and_then(DateTime::from_timestamp_micros)
        .unwrap_or(DateTime::UNIX_EPOCH)
}
