// Copyright (c) 2025 - Cowboy AI, Inc.
//! Atomic document updates
//!
//! An [`AtomicUpdate`] is data, not execution: a list of preconditions and
//! field operations that a store applies to one document in a single step.
//! [`apply_update`] is the pure interpreter shared by every backend, so the
//! in-memory and NATS stores agree on semantics exactly.
//!
//! ```text
//! apply_update(Fields, AtomicUpdate, now) → Result<Applied, StoreError>
//! ```
//!
//! Preconditions are all checked before any operation runs; a failed
//! precondition leaves the input untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::{timestamp_value, Document, UPDATED_AT};
use crate::errors::{StoreError, StoreResult};

/// Condition that must hold on the current document for an update to apply
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// Array field contains the value
    Contains {
        /// Array field
        field: String,
        /// Required member
        value: Value,
    },

    /// Array field does not contain the value
    NotContains {
        /// Array field
        field: String,
        /// Forbidden member
        value: Value,
    },

    /// Counter is strictly below the number stored in `limit_field`;
    /// holds trivially when `limit_field` is absent or null
    BelowLimit {
        /// Counter field
        counter_field: String,
        /// Field holding the limit
        limit_field: String,
    },
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::Contains { field, value } => write!(f, "{} contains {}", field, value),
            Precondition::NotContains { field, value } => {
                write!(f, "{} does not contain {}", field, value)
            }
            Precondition::BelowLimit {
                counter_field,
                limit_field,
            } => write!(f, "{} below {}", counter_field, limit_field),
        }
    }
}

/// Single field operation
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Overwrite a field
    Set {
        /// Field name
        field: String,
        /// New value
        value: Value,
    },

    /// Add `delta` to an integer field (missing counts as 0), never going
    /// below `floor` when one is given
    Increment {
        /// Field name
        field: String,
        /// Amount to add (may be negative)
        delta: i64,
        /// Lowest allowed result
        floor: Option<i64>,
    },

    /// Append to an array field unless already present
    AddToSet {
        /// Array field
        field: String,
        /// Member to add
        value: Value,
    },

    /// Remove every occurrence of a value from an array field
    RemoveFromSet {
        /// Array field
        field: String,
        /// Member to remove
        value: Value,
    },

    /// Add the value if absent (counter +1) or remove it if present
    /// (counter -1, floored at 0)
    ToggleMembership {
        /// Array field
        set_field: String,
        /// Counter kept equal to the array length
        counter_field: String,
        /// Member to toggle
        value: Value,
    },
}

/// Direction a toggle went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Value was added to the set
    Added,
    /// Value was removed from the set
    Removed,
}

/// Preconditions plus operations applied atomically to one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomicUpdate {
    /// Checked first, all must hold
    pub preconditions: Vec<Precondition>,
    /// Applied in order
    pub ops: Vec<FieldOp>,
    /// Refresh `updatedAt`
    pub touch: bool,
}

impl AtomicUpdate {
    /// Empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a precondition
    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Overwrite a field
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.ops.push(FieldOp::Set {
            field: field.into(),
            value,
        });
        self
    }

    /// Unbounded increment
    pub fn increment(mut self, field: impl Into<String>, delta: i64) -> Self {
        self.ops.push(FieldOp::Increment {
            field: field.into(),
            delta,
            floor: None,
        });
        self
    }

    /// Increment that never drops below `floor`
    pub fn increment_with_floor(mut self, field: impl Into<String>, delta: i64, floor: i64) -> Self {
        self.ops.push(FieldOp::Increment {
            field: field.into(),
            delta,
            floor: Some(floor),
        });
        self
    }

    /// Append to a set-like array
    pub fn add_to_set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.ops.push(FieldOp::AddToSet {
            field: field.into(),
            value,
        });
        self
    }

    /// Remove from a set-like array
    pub fn remove_from_set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.ops.push(FieldOp::RemoveFromSet {
            field: field.into(),
            value,
        });
        self
    }

    /// Toggle membership and keep the paired counter in step
    pub fn toggle_membership(
        mut self,
        set_field: impl Into<String>,
        counter_field: impl Into<String>,
        value: Value,
    ) -> Self {
        self.ops.push(FieldOp::ToggleMembership {
            set_field: set_field.into(),
            counter_field: counter_field.into(),
            value,
        });
        self
    }

    /// Refresh `updatedAt`
    pub fn touch(mut self) -> Self {
        self.touch = true;
        self
    }
}

/// Result of a committed update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Document as committed
    pub document: Document,
    /// Counter fields whose floor clamp kicked in
    pub clamped: Vec<String>,
    /// Direction of the last toggle operation, if any
    pub toggled: Option<Membership>,
}

/// Fields produced by [`apply_update`]
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// New document fields
    pub data: Map<String, Value>,
    /// Counter fields whose floor clamp kicked in
    pub clamped: Vec<String>,
    /// Direction of the last toggle operation, if any
    pub toggled: Option<Membership>,
}

impl Applied {
    /// Attach the document id
    pub fn into_outcome(self, id: impl Into<String>) -> UpdateOutcome {
        UpdateOutcome {
            document: Document::new(id, self.data),
            clamped: self.clamped,
            toggled: self.toggled,
        }
    }
}

/// Apply an update to document fields without mutating the input
///
/// # Errors
///
/// - `PreconditionFailed` with the first precondition that does not hold
/// - `InvalidField` if a set field is not an array or a counter not an integer
pub fn apply_update(
    current: &Map<String, Value>,
    update: &AtomicUpdate,
    now: DateTime<Utc>,
) -> StoreResult<Applied> {
    for precondition in &update.preconditions {
        if !check(current, precondition)? {
            return Err(StoreError::PreconditionFailed(precondition.clone()));
        }
    }

    let mut data = current.clone();
    let mut clamped = Vec::new();
    let mut toggled = None;

    for op in &update.ops {
        match op {
            FieldOp::Set { field, value } => {
                data.insert(field.clone(), value.clone());
            }
            FieldOp::Increment {
                field,
                delta,
                floor,
            } => {
                if add_to_counter(&mut data, field, *delta, *floor)? {
                    clamped.push(field.clone());
                }
            }
            FieldOp::AddToSet { field, value } => {
                let members = array_mut(&mut data, field)?;
                if !members.contains(value) {
                    members.push(value.clone());
                }
            }
            FieldOp::RemoveFromSet { field, value } => {
                array_mut(&mut data, field)?.retain(|member| member != value);
            }
            FieldOp::ToggleMembership {
                set_field,
                counter_field,
                value,
            } => {
                let members = array_mut(&mut data, set_field)?;
                let direction = if members.contains(value) {
                    members.retain(|member| member != value);
                    Membership::Removed
                } else {
                    members.push(value.clone());
                    Membership::Added
                };
                let delta = match direction {
                    Membership::Added => 1,
                    Membership::Removed => -1,
                };
                if add_to_counter(&mut data, counter_field, delta, Some(0))? {
                    clamped.push(counter_field.clone());
                }
                toggled = Some(direction);
            }
        }
    }

    if update.touch {
        let previous = data.get(UPDATED_AT).and_then(Value::as_i64).unwrap_or(i64::MIN);
        let stamped = timestamp_value(now);
        if stamped.as_i64().unwrap_or(i64::MIN) >= previous {
            data.insert(UPDATED_AT.to_string(), stamped);
        }
    }

    Ok(Applied {
        data,
        clamped,
        toggled,
    })
}

fn check(data: &Map<String, Value>, precondition: &Precondition) -> StoreResult<bool> {
    match precondition {
        Precondition::Contains { field, value } => Ok(array(data, field)?.contains(value)),
        Precondition::NotContains { field, value } => Ok(!array(data, field)?.contains(value)),
        Precondition::BelowLimit {
            counter_field,
            limit_field,
        } => match data.get(limit_field) {
            None | Some(Value::Null) => Ok(true),
            Some(limit) => {
                let limit = limit.as_i64().ok_or_else(|| StoreError::InvalidField {
                    field: limit_field.clone(),
                    reason: "expected an integer".to_string(),
                })?;
                Ok(counter(data, counter_field)? < limit)
            }
        },
    }
}

fn array<'a>(data: &'a Map<String, Value>, field: &str) -> StoreResult<&'a [Value]> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(members)) => Ok(members),
        Some(_) => Err(StoreError::InvalidField {
            field: field.to_string(),
            reason: "expected an array".to_string(),
        }),
    }
}

fn array_mut<'a>(data: &'a mut Map<String, Value>, field: &str) -> StoreResult<&'a mut Vec<Value>> {
    let slot = data
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(members) => Ok(members),
        _ => Err(StoreError::InvalidField {
            field: field.to_string(),
            reason: "expected an array".to_string(),
        }),
    }
}

fn counter(data: &Map<String, Value>, field: &str) -> StoreResult<i64> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_i64().ok_or_else(|| StoreError::InvalidField {
            field: field.to_string(),
            reason: "expected an integer".to_string(),
        }),
    }
}

/// Returns true when the floor clamp was applied
fn add_to_counter(
    data: &mut Map<String, Value>,
    field: &str,
    delta: i64,
    floor: Option<i64>,
) -> StoreResult<bool> {
    let next = counter(data, field)?.saturating_add(delta);
    let (value, clamped) = match floor {
        Some(floor) if next < floor => (floor, true),
        _ => (next, false),
    };
    data.insert(field.to_string(), Value::from(value));
    Ok(clamped)
}
