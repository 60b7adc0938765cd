// Copyright (c) 2025 - Cowboy AI, Inc.
//! Comment Aggregate Service
//!
//! Comments are append-only documents in the `comments` collection. They are
//! never edited; authors and administrators may delete them.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, warn};

use crate::aggregate::fields;
use crate::aggregate::handlers::handle_add_comment;
use crate::domain::{Comment, Identity};
use crate::errors::{CercoError, CercoResult, EntityKind};
use crate::store::{Collection, Direction, DocumentStore, Query, CREATED_AT};

/// Comment aggregate operations
#[async_trait]
pub trait CommentService: Send + Sync {
    /// Add a comment to an existing event
    ///
    /// # Errors
    ///
    /// - `Validation` if unauthenticated, empty or over 500 characters
    /// - `NotFound` if the event does not exist
    async fn add_comment(
        &self,
        event_id: &str,
        author: Option<&Identity>,
        text: &str,
    ) -> CercoResult<Comment>;

    /// Delete a comment as its author or an administrator
    ///
    /// # Errors
    ///
    /// - `NotFound` if the comment does not exist
    /// - `Permission` for anyone else
    async fn delete_comment(&self, comment_id: &str, requester: &Identity) -> CercoResult<()>;

    /// Comments of an event, newest first
    async fn list_comments(&self, event_id: &str) -> CercoResult<Vec<Comment>>;
}

/// [`CommentService`] over any [`DocumentStore`]
#[derive(Clone)]
pub struct CommentAggregateService {
    store: Arc<dyn DocumentStore>,
}

impl CommentAggregateService {
    /// Create the service
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

/// Query for an event's comments in display order
pub fn comments_for(event_id: &str) -> Query {
    Query::collection(Collection::Comments)
        .filter_eq(fields::EVENT_ID, json!(event_id))
        .order_by(CREATED_AT, Direction::Descending)
}

#[async_trait]
impl CommentService for CommentAggregateService {
    async fn add_comment(
        &self,
        event_id: &str,
        author: Option<&Identity>,
        text: &str,
    ) -> CercoResult<Comment> {
        let document = handle_add_comment(event_id, author, text)?;

        if self.store.get(Collection::Events, event_id).await?.is_none() {
            return Err(CercoError::not_found(EntityKind::Event, event_id));
        }

        let created = self
            .store
            .create(Collection::Comments, document)
            .await
            .map_err(|e| {
                error!(event_id = %event_id, error = %e, "failed to write comment");
                CercoError::Store(e)
            })?;

        info!(event_id = %event_id, comment_id = %created.id, "comment added");
        Ok(created.decode()?)
    }

    async fn delete_comment(&self, comment_id: &str, requester: &Identity) -> CercoResult<()> {
        let doc = self
            .store
            .get(Collection::Comments, comment_id)
            .await?
            .ok_or_else(|| CercoError::not_found(EntityKind::Comment, comment_id))?;
        let comment: Comment = doc.decode()?;

        if comment.user_id != requester.user_id && !requester.is_admin {
            warn!(comment_id = %comment_id, requester = %requester.user_id, "comment delete refused");
            return Err(CercoError::Permission(format!(
                "only the author or an administrator may delete comment {}",
                comment_id
            )));
        }

        if !self.store.delete(Collection::Comments, comment_id).await? {
            return Err(CercoError::not_found(EntityKind::Comment, comment_id));
        }
        info!(comment_id = %comment_id, requester = %requester.user_id, "comment deleted");
        Ok(())
    }

    async fn list_comments(&self, event_id: &str) -> CercoResult<Vec<Comment>> {
        let docs = self.store.query(&comments_for(event_id)).await?;
        docs.iter()
            .map(|doc| doc.decode().map_err(CercoError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use serde_json::Map;

    async fn setup() -> (CommentAggregateService, String) {
        let store = InMemoryDocumentStore::new();
        let event = store.create(Collection::Events, Map::new()).await.unwrap();
        (CommentAggregateService::new(Arc::new(store)), event.id)
    }

    #[tokio::test]
    async fn test_add_comment_to_missing_event() {
        let (service, _) = setup().await;
        let err = service
            .add_comment("gone", Some(&Identity::new("u1")), "hi")
            .await
            .unwrap_err();
        assert_eq!(err, CercoError::not_found(EntityKind::Event, "gone"));
    }

    #[tokio::test]
    async fn test_only_author_or_admin_may_delete() {
        let (service, event_id) = setup().await;
        let author = Identity::new("author");
        let comment = service
            .add_comment(&event_id, Some(&author), "first!")
            .await
            .unwrap();

        let err = service
            .delete_comment(&comment.id, &Identity::new("stranger"))
            .await
            .unwrap_err();
        assert!(matches!(err, CercoError::Permission(_)));

        service
            .delete_comment(&comment.id, &Identity::new("mod").admin())
            .await
            .unwrap();
        assert!(service.list_comments(&event_id).await.unwrap().is_empty());
    }
}
