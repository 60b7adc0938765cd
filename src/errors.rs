// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for the Cerco events core
//!
//! Two layers:
//! - [`StoreError`] - document store adapter failures (infrastructure)
//! - [`CercoError`] - the taxonomy every public aggregate operation returns
//!
//! Store errors surface unchanged inside [`CercoError::Store`] so callers can
//! decide whether to retry; the core itself never retries a caller operation.

use thiserror::Error;

use crate::store::{Collection, Precondition};

/// Errors that can occur in document store operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Document does not exist
    #[error("{collection} document {id} not found")]
    NotFound {
        /// Collection that was searched
        collection: Collection,
        /// Document id
        id: String,
    },

    /// Document already exists (create with an explicit id)
    #[error("{collection} document {id} already exists")]
    AlreadyExists {
        /// Collection written to
        collection: Collection,
        /// Document id
        id: String,
    },

    /// A precondition of an atomic update did not hold; nothing was written
    #[error("Precondition failed: {0}")]
    PreconditionFailed(Precondition),

    /// Optimistic write lost too many races against concurrent writers
    #[error("Write conflict on {collection}/{id} after {attempts} attempts")]
    Conflict {
        /// Collection written to
        collection: Collection,
        /// Document id
        id: String,
        /// Number of compare-and-swap attempts made
        attempts: usize,
    },

    /// Document field holds a value the operation cannot work with
    #[error("Invalid document field {field}: {reason}")]
    InvalidField {
        /// Field name
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// NATS connection error
    #[error("NATS connection error: {0}")]
    Connection(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend rejected or failed the operation
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Failure injected by a test harness
    #[error("Injected store failure: {0}")]
    Injected(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. }
                | StoreError::Connection(_)
                | StoreError::Backend(_)
                | StoreError::Injected(_)
        )
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<async_nats::Error> for StoreError {
    fn from(err: async_nats::Error) -> Self {
        StoreError::Connection(err.to_string())
    }
}

/// Kind of entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Campus event
    Event,
    /// Comment on an event
    Comment,
    /// User profile
    User,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Event => write!(f, "event"),
            EntityKind::Comment => write!(f, "comment"),
            EntityKind::User => write!(f, "user"),
        }
    }
}

/// Errors returned by the aggregate services
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CercoError {
    /// Bad input shape or range; never retried
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// Offending field
        field: String,
        /// Human readable reason, e.g. "is required"
        reason: String,
    },

    /// Referenced event or comment is absent
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind of entity
        kind: EntityKind,
        /// Entity id
        id: String,
    },

    /// User already attends the event
    #[error("User {user_id} already joined event {event_id}")]
    AlreadyMember {
        /// Event id
        event_id: String,
        /// User id
        user_id: String,
    },

    /// User does not attend the event
    #[error("User {user_id} has not joined event {event_id}")]
    NotMember {
        /// Event id
        event_id: String,
        /// User id
        user_id: String,
    },

    /// User has not liked the event
    #[error("User {user_id} has not liked event {event_id}")]
    NotLiked {
        /// Event id
        event_id: String,
        /// User id
        user_id: String,
    },

    /// Event reached its attendee limit
    #[error("Event {event_id} is full ({max_attendees} attendees)")]
    CapacityReached {
        /// Event id
        event_id: String,
        /// Configured capacity
        max_attendees: u64,
    },

    /// Caller may not perform the operation
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Infrastructure failure, propagated as-is
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CercoError {
    /// Build a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CercoError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build a not-found error
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        CercoError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether the caller may retry the operation
    pub fn is_retryable(&self) -> bool {
        match self {
            CercoError::Store(err) => err.is_transient(),
            _ => false,
        }
    }

    /// Short message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            CercoError::Validation { field, reason } => format!("{} {}", field, reason),
            CercoError::NotFound { kind, .. } => format!("This {} no longer exists", kind),
            CercoError::AlreadyMember { .. } => "Already joined this event".to_string(),
            CercoError::NotMember { .. } => "Not joined this event".to_string(),
            CercoError::NotLiked { .. } => "You have not liked this event".to_string(),
            CercoError::CapacityReached { .. } => "This event is full".to_string(),
            CercoError::Permission(_) => "You are not allowed to do that".to_string(),
            CercoError::Store(_) => "Something went wrong, please try again".to_string(),
        }
    }
}

/// Result type for aggregate operations
pub type CercoResult<T> = Result<T, CercoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_retryable_only_when_transient() {
        let transient = CercoError::Store(StoreError::Connection("reset".into()));
        let permanent = CercoError::Store(StoreError::Serialization("bad json".into()));

        assert!(transient.is_retryable());
        assert!(!permanent.is_retryable());
        assert!(!CercoError::validation("title", "is required").is_retryable());
    }

    #[test]
    fn test_user_message_hides_infrastructure_detail() {
        let err = CercoError::Store(StoreError::Backend("jetstream: stream offline".into()));
        assert_eq!(err.user_message(), "Something went wrong, please try again");
        assert!(err.to_string().contains("stream offline"));
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = CercoError::validation("description", "is required");
        assert_eq!(err.to_string(), "Invalid description: is required");
        assert_eq!(err.user_message(), "description is required");
    }
}
