// Copyright (c) 2025 - Cowboy AI, Inc.
//! Document Store Abstraction
//!
//! This module defines the document storage interface the aggregate services,
//! triggers and read models are written against, plus two implementations.
//!
//! # Architecture
//!
//! ```text
//! Service → AtomicUpdate → DocumentStore → Collections
//!                               ↓                ↓
//!                          Change feed    Snapshot subscriptions
//!                               ↓                ↓
//!                           Triggers        Read models
//! ```
//!
//! # Consistency Contract
//!
//! 1. **Per-document atomicity**: an [`AtomicUpdate`] (preconditions plus
//!    field operations) is applied entirely or not at all
//! 2. **No lost updates**: set/counter operations are evaluated against the
//!    latest committed document, never a stale client copy
//! 3. **Server time**: `createdAt`/`updatedAt` are stamped by the store
//! 4. **Push, not poll**: subscribers receive full snapshots after every
//!    change to their collection
//!
//! There are no cross-document transactions, except that
//! [`DocumentStore::commit_batch`] is all-or-nothing where the backend
//! allows it.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::{StoreError, StoreResult};

pub mod memory;
pub mod nats;
pub mod query;
pub mod update;

pub use memory::{InMemoryDocumentStore, StoreOperation};
pub use nats::NatsDocumentStore;
pub use query::{BatchWrite, Direction, Filter, Query, WriteBatch};
pub use update::{apply_update, AtomicUpdate, FieldOp, Membership, Precondition, UpdateOutcome};

/// Field holding the creation timestamp (microseconds since epoch)
pub const CREATED_AT: &str = "createdAt";

/// Field holding the last-modification timestamp (microseconds since epoch)
pub const UPDATED_AT: &str = "updatedAt";

/// Collections known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Campus events
    Events,
    /// Event comments
    Comments,
    /// User profiles and statistics
    Users,
    /// Per-user notification records
    Notifications,
}

impl Collection {
    /// Every collection, in a stable order
    pub const ALL: [Collection; 4] = [
        Collection::Events,
        Collection::Comments,
        Collection::Users,
        Collection::Notifications,
    ];

    /// Collection name as used in keys and subjects
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Events => "events",
            Collection::Comments => "comments",
            Collection::Users => "users",
            Collection::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document: id plus JSON fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned identifier
    pub id: String,

    /// Document fields (camelCase names, never contains `id`)
    pub data: Map<String, Value>,
}

impl Document {
    /// Create a document
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Read a field
    pub fn field(&self, name: &str) -> Option<&Value> {
        if name == "id" {
            return None;
        }
        self.data.get(name)
    }

    /// Creation timestamp in microseconds, 0 if absent
    pub fn created_at_micros(&self) -> i64 {
        self.data.get(CREATED_AT).and_then(Value::as_i64).unwrap_or(0)
    }

    /// Decode into a typed model; the id is injected as field `id`
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = self.data.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Encode a typed model into document fields, dropping any `id` field
pub fn encode<T: Serialize>(value: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::Serialization(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Store representation of a timestamp
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::from(at.timestamp_micros())
}

/// Stamp `createdAt` and `updatedAt` on freshly created fields
pub(crate) fn stamp_created(fields: &mut Map<String, Value>, now: DateTime<Utc>) {
    fields.insert(CREATED_AT.to_string(), timestamp_value(now));
    fields.insert(UPDATED_AT.to_string(), timestamp_value(now));
}

/// Message delivered to a snapshot subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    /// Complete, ordered result of the subscribed query
    Snapshot(Vec<Document>),

    /// The subscription hit an error; later snapshots may still follow
    Error(StoreError),
}

/// Kind of document change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Document was created
    Created,
    /// Document was modified
    Updated,
    /// Document was removed
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Created => write!(f, "created"),
            ChangeKind::Updated => write!(f, "updated"),
            ChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// A single committed change, with the document before and after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChange {
    /// Collection of the changed document
    pub collection: Collection,
    /// Document id
    pub id: String,
    /// What happened
    pub kind: ChangeKind,
    /// State before the change (absent on create)
    pub before: Option<Document>,
    /// State after the change (absent on delete)
    pub after: Option<Document>,
}

/// Receiving end of a push channel from the store
///
/// Dropping the feed unsubscribes; any backing task is aborted.
#[derive(Debug)]
pub struct Feed<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    task: Option<JoinHandle<()>>,
}

impl<T> Feed<T> {
    /// Feed fed directly by the store
    pub fn new(receiver: mpsc::UnboundedReceiver<T>) -> Self {
        Self {
            receiver,
            task: None,
        }
    }

    /// Feed fed by a background task owned by the feed
    pub fn with_task(receiver: mpsc::UnboundedReceiver<T>, task: JoinHandle<()>) -> Self {
        Self {
            receiver,
            task: Some(task),
        }
    }

    /// Wait for the next message; `None` once the store side is gone
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Take a message if one is already queued
    pub fn try_next(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}

impl<T> Drop for Feed<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Snapshot subscription to a query
pub type Subscription = Feed<SubscriptionEvent>;

/// Change feed for one collection
pub type ChangeFeed = Feed<DocumentChange>;

/// Document Store trait
///
/// Implementations must guarantee per-document atomicity of
/// [`DocumentStore::atomic_update`]: preconditions are checked against the
/// latest committed state in the same step that applies the operations.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document with a store-assigned id; stamps timestamps
    async fn create(&self, collection: Collection, data: Map<String, Value>)
        -> StoreResult<Document>;

    /// Create a document under a caller-chosen id
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the id is taken
    async fn create_with_id(
        &self,
        collection: Collection,
        id: &str,
        data: Map<String, Value>,
    ) -> StoreResult<Document>;

    /// Read a document
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>>;

    /// Atomically apply preconditions and field operations to one document
    ///
    /// # Errors
    ///
    /// - `NotFound` if the document is absent
    /// - `PreconditionFailed` if a precondition does not hold (nothing written)
    /// - `Conflict` if an optimistic backend gave up after repeated races
    async fn atomic_update(
        &self,
        collection: Collection,
        id: &str,
        update: AtomicUpdate,
    ) -> StoreResult<UpdateOutcome>;

    /// Delete a document; returns whether it existed
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool>;

    /// Run a filtered, ordered query
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Commit a batch of writes; returns the number of writes applied
    async fn commit_batch(&self, batch: WriteBatch) -> StoreResult<usize>;

    /// Subscribe to full snapshots of a query
    ///
    /// The first message is the current snapshot.
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription>;

    /// Subscribe to committed changes of a collection
    async fn changes(&self, collection: Collection) -> StoreResult<ChangeFeed>;
}
