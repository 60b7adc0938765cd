// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event Aggregate Service
//!
//! Application service owning the social state of events (attendees and
//! likes). Each operation is exactly one store call:
//!
//! ```text
//! Identity + Command → Handler (pure) → AtomicUpdate → DocumentStore
//!                                                          ↓
//!                                  PreconditionFailed → domain error
//! ```
//!
//! # Transaction Semantics
//!
//! The atomicity boundary is one document write. Membership checks are
//! preconditions evaluated by the store in the same step as the write, so
//! concurrent joins can never lose an update or double-count a user. On any
//! failure nothing is written.
//!
//! The service never retries; transient store errors surface as
//! [`CercoError::Store`] for the caller to decide.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::aggregate::commands::{EventDraft, EventPatch};
use crate::aggregate::fields;
use crate::aggregate::handlers::*;
use crate::domain::{Event, Identity};
use crate::errors::{CercoError, CercoResult, EntityKind, StoreError};
use crate::store::{
    AtomicUpdate, Collection, DocumentStore, Membership, Precondition, UpdateOutcome,
};

/// Result of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The user now likes the event
    Liked,
    /// The user's like was removed
    Unliked,
}

/// Event aggregate operations
#[async_trait]
pub trait EventService: Send + Sync {
    /// Validate and create an event hosted by `host`; returns the new id
    ///
    /// # Errors
    ///
    /// - `Validation` naming the first invalid field
    /// - `Store` if the write fails
    async fn create_event(&self, host: &Identity, draft: EventDraft) -> CercoResult<String>;

    /// Add the user to the attendees
    ///
    /// # Errors
    ///
    /// - `NotFound`, `AlreadyMember`, `CapacityReached`
    async fn join_event(&self, event_id: &str, identity: &Identity) -> CercoResult<Event>;

    /// Remove the user from the attendees
    ///
    /// # Errors
    ///
    /// - `NotFound`, `NotMember`
    async fn leave_event(&self, event_id: &str, identity: &Identity) -> CercoResult<Event>;

    /// Toggle the user's like
    async fn like_event(&self, event_id: &str, identity: &Identity) -> CercoResult<LikeOutcome>;

    /// Remove the user's like
    ///
    /// # Errors
    ///
    /// - `NotFound`, `NotLiked`
    async fn unlike_event(&self, event_id: &str, identity: &Identity) -> CercoResult<Event>;

    /// Merge descriptive fields and refresh `updatedAt`
    async fn update_event(&self, event_id: &str, patch: EventPatch) -> CercoResult<Event>;

    /// Hard delete; comments are left in place
    async fn delete_event(&self, event_id: &str) -> CercoResult<()>;

    /// Read an event
    async fn get_event(&self, event_id: &str) -> CercoResult<Event>;
}

/// [`EventService`] over any [`DocumentStore`]
#[derive(Clone)]
pub struct EventAggregateService {
    store: Arc<dyn DocumentStore>,
}

impl EventAggregateService {
    /// Create the service
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn update(
        &self,
        event_id: &str,
        update: AtomicUpdate,
    ) -> Result<UpdateOutcome, StoreError> {
        self.store
            .atomic_update(Collection::Events, event_id, update)
            .await
    }

    /// Capacity of an event, read after a rejected join for the error
    async fn capacity_of(&self, event_id: &str) -> Option<u64> {
        match self.store.get(Collection::Events, event_id).await {
            Ok(Some(doc)) => doc.field(fields::MAX_ATTENDEES).and_then(Value::as_u64),
            _ => None,
        }
    }
}

fn decode(outcome: &UpdateOutcome) -> CercoResult<Event> {
    Ok(outcome.document.decode()?)
}

/// Map store failures that are not precondition related
fn store_failure(operation: &'static str, event_id: &str, err: StoreError) -> CercoError {
    match err {
        StoreError::NotFound { .. } => CercoError::not_found(EntityKind::Event, event_id),
        err => {
            error!(operation, event_id = %event_id, error = %err, "event store operation failed");
            CercoError::Store(err)
        }
    }
}

#[async_trait]
impl EventService for EventAggregateService {
    async fn create_event(&self, host: &Identity, draft: EventDraft) -> CercoResult<String> {
        let document = handle_create_event(draft, host)?;

        let created = self
            .store
            .create(Collection::Events, document)
            .await
            .map_err(|e| {
                error!(host = %host.user_id, error = %e, "failed to create event");
                CercoError::Store(e)
            })?;

        info!(event_id = %created.id, host = %host.user_id, "event created");
        Ok(created.id)
    }

    async fn join_event(&self, event_id: &str, identity: &Identity) -> CercoResult<Event> {
        let user_id = identity.user_id.as_str();

        match self.update(event_id, handle_join(user_id)).await {
            Ok(outcome) => {
                let event = decode(&outcome)?;
                info!(event_id = %event_id, user_id = %user_id, attendees = event.attendees, "user joined event");
                Ok(event)
            }
            Err(StoreError::PreconditionFailed(failed)) => {
                let max = match failed {
                    Precondition::BelowLimit { .. } => self.capacity_of(event_id).await,
                    _ => None,
                };
                Err(join_rejection(event_id, user_id, &failed, max))
            }
            Err(err) => Err(store_failure("join", event_id, err)),
        }
    }

    async fn leave_event(&self, event_id: &str, identity: &Identity) -> CercoResult<Event> {
        let user_id = identity.user_id.as_str();

        match self.update(event_id, handle_leave(user_id)).await {
            Ok(outcome) => {
                if !outcome.clamped.is_empty() {
                    warn!(
                        event_id = %event_id,
                        fields = ?outcome.clamped,
                        "attendee counter was already zero; clamped"
                    );
                }
                let event = decode(&outcome)?;
                info!(event_id = %event_id, user_id = %user_id, attendees = event.attendees, "user left event");
                Ok(event)
            }
            Err(StoreError::PreconditionFailed(_)) => Err(CercoError::NotMember {
                event_id: event_id.to_string(),
                user_id: user_id.to_string(),
            }),
            Err(err) => Err(store_failure("leave", event_id, err)),
        }
    }

    async fn like_event(&self, event_id: &str, identity: &Identity) -> CercoResult<LikeOutcome> {
        let outcome = self
            .update(event_id, handle_toggle_like(&identity.user_id))
            .await
            .map_err(|e| store_failure("like", event_id, e))?;

        if !outcome.clamped.is_empty() {
            warn!(event_id = %event_id, "like counter was already zero; clamped");
        }

        let result = match outcome.toggled {
            Some(Membership::Added) => LikeOutcome::Liked,
            _ => LikeOutcome::Unliked,
        };
        info!(event_id = %event_id, user_id = %identity.user_id, ?result, "like toggled");
        Ok(result)
    }

    async fn unlike_event(&self, event_id: &str, identity: &Identity) -> CercoResult<Event> {
        match self.update(event_id, handle_unlike(&identity.user_id)).await {
            Ok(outcome) => {
                if !outcome.clamped.is_empty() {
                    warn!(event_id = %event_id, "like counter was already zero; clamped");
                }
                decode(&outcome)
            }
            Err(StoreError::PreconditionFailed(_)) => Err(CercoError::NotLiked {
                event_id: event_id.to_string(),
                user_id: identity.user_id.clone(),
            }),
            Err(err) => Err(store_failure("unlike", event_id, err)),
        }
    }

    async fn update_event(&self, event_id: &str, patch: EventPatch) -> CercoResult<Event> {
        let update = handle_update(patch)?;
        let outcome = self
            .update(event_id, update)
            .await
            .map_err(|e| store_failure("update", event_id, e))?;

        info!(event_id = %event_id, "event updated");
        decode(&outcome)
    }

    async fn delete_event(&self, event_id: &str) -> CercoResult<()> {
        let existed = self
            .store
            .delete(Collection::Events, event_id)
            .await
            .map_err(|e| store_failure("delete", event_id, e))?;

        if !existed {
            return Err(CercoError::not_found(EntityKind::Event, event_id));
        }
        info!(event_id = %event_id, "event deleted");
        Ok(())
    }

    async fn get_event(&self, event_id: &str) -> CercoResult<Event> {
        let doc = self
            .store
            .get(Collection::Events, event_id)
            .await
            .map_err(|e| store_failure("get", event_id, e))?
            .ok_or_else(|| CercoError::not_found(EntityKind::Event, event_id))?;
        Ok(doc.decode()?)
    }
}
