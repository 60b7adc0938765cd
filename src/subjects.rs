// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for document change notifications
//!
//! # Subject Pattern
//!
//! Every committed change is published on:
//!
//! ```text
//! cerco.{collection}.{kind}
//! ```
//!
//! This allows for:
//! - Precise subscriptions (`cerco.events.created`)
//! - Collection-level wildcards (`cerco.events.>`)
//! - Global subscriptions (`cerco.>`)
//!
//! # Examples
//!
//! ```rust
//! use cerco_events::store::{ChangeKind, Collection};
//! use cerco_events::subjects::SubjectBuilder;
//!
//! let subject = SubjectBuilder::new(Collection::Events)
//!     .kind(ChangeKind::Created)
//!     .build();
//! assert_eq!(subject, "cerco.events.created");
//!
//! let wildcard = SubjectBuilder::new(Collection::Comments).build();
//! assert_eq!(wildcard, "cerco.comments.>");
//! ```

use crate::store::{ChangeKind, Collection};

/// Root namespace for all change subjects
pub const CERCO_ROOT: &str = "cerco";

/// Builder for change notification subjects
#[derive(Debug, Clone)]
pub struct SubjectBuilder {
    collection: Collection,
    kind: Option<ChangeKind>,
}

impl SubjectBuilder {
    /// Start a subject for a collection
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            kind: None,
        }
    }

    /// Narrow to one kind of change
    pub fn kind(mut self, kind: ChangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Build the subject; without a kind this is the collection wildcard
    pub fn build(self) -> String {
        match self.kind {
            Some(kind) => format!("{}.{}.{}", CERCO_ROOT, self.collection, kind),
            None => format!("{}.{}.>", CERCO_ROOT, self.collection),
        }
    }

    /// Subscription for every change in every collection
    pub fn build_all() -> String {
        format!("{}.>", CERCO_ROOT)
    }
}

/// Subject a change is published on
pub fn change_subject(collection: Collection, kind: ChangeKind) -> String {
    SubjectBuilder::new(collection).kind(kind).build()
}

/// Wildcard covering all changes of a collection
pub fn collection_wildcard(collection: Collection) -> String {
    SubjectBuilder::new(collection).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_subject() {
        assert_eq!(
            change_subject(Collection::Events, ChangeKind::Updated),
            "cerco.events.updated"
        );
        assert_eq!(
            change_subject(Collection::Notifications, ChangeKind::Deleted),
            "cerco.notifications.deleted"
        );
    }

    #[test]
    fn test_wildcard_subjects() {
        assert_eq!(collection_wildcard(Collection::Users), "cerco.users.>");
        assert_eq!(SubjectBuilder::build_all(), "cerco.>");
    }
}
