// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory document store
//!
//! Reference implementation of [`DocumentStore`]. Every mutation runs under a
//! single async write lock, which gives per-document atomicity for free and
//! makes batches all-or-nothing. Subscribers and change watchers are plain
//! unbounded channels notified before the lock is released, so they observe
//! commits in commit order.
//!
//! Tests can inject failures per operation with
//! [`InMemoryDocumentStore::fail_next`] and push subscription errors with
//! [`InMemoryDocumentStore::fail_subscriptions`].

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::{
    apply_update, stamp_created, AtomicUpdate, BatchWrite, ChangeFeed, ChangeKind, Collection,
    Document, DocumentChange, DocumentStore, Feed, Query, Subscription, SubscriptionEvent,
    UpdateOutcome, WriteBatch,
};
use crate::clock::{Clock, SystemClock};
use crate::errors::{StoreError, StoreResult};

/// Store operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `create` and `create_with_id`
    Create,
    /// `get`
    Get,
    /// `atomic_update`
    Update,
    /// `delete`
    Delete,
    /// `query`
    Query,
    /// `commit_batch`
    CommitBatch,
    /// `subscribe` and `changes`
    Subscribe,
}

struct Subscriber {
    query: Query,
    sender: mpsc::UnboundedSender<SubscriptionEvent>,
}

#[derive(Default)]
struct State {
    collections: HashMap<Collection, BTreeMap<String, Map<String, Value>>>,
    subscribers: Vec<Subscriber>,
    watchers: HashMap<Collection, Vec<mpsc::UnboundedSender<DocumentChange>>>,
    failures: HashMap<StoreOperation, VecDeque<String>>,
}

impl State {
    fn take_failure(&mut self, operation: StoreOperation) -> StoreResult<()> {
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(message) => Err(StoreError::Injected(message)),
            None => Ok(()),
        }
    }

    fn documents(&self, collection: Collection) -> Vec<Document> {
        self.collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn get(&self, collection: Collection, id: &str) -> Option<Document> {
        self.collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone()))
    }

    fn insert(&mut self, collection: Collection, id: &str, data: Map<String, Value>) {
        self.collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), data);
    }

    fn remove(&mut self, collection: Collection, id: &str) -> Option<Document> {
        self.collections
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id))
            .map(|data| Document::new(id, data))
    }

    /// Push changes to watchers and fresh snapshots to affected subscribers
    fn publish(&mut self, changes: Vec<DocumentChange>) {
        if changes.is_empty() {
            return;
        }

        let mut touched: Vec<Collection> = changes.iter().map(|c| c.collection).collect();
        touched.sort();
        touched.dedup();

        for change in changes {
            if let Some(watchers) = self.watchers.get_mut(&change.collection) {
                watchers.retain(|watcher| watcher.send(change.clone()).is_ok());
            }
        }

        let mut subscribers = std::mem::take(&mut self.subscribers);
        subscribers.retain(|subscriber| {
            if !touched.contains(&subscriber.query.collection) {
                return !subscriber.sender.is_closed();
            }
            let snapshot = subscriber
                .query
                .apply(self.documents(subscriber.query.collection));
            subscriber
                .sender
                .send(SubscriptionEvent::Snapshot(snapshot))
                .is_ok()
        });
        self.subscribers = subscribers;
    }
}

/// In-memory [`DocumentStore`]
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<State>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Empty store stamped by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty store stamped by the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            clock,
        }
    }

    /// Make the next call of `operation` fail with [`StoreError::Injected`]
    ///
    /// Calls queue up: injecting twice fails the next two calls.
    pub async fn fail_next(&self, operation: StoreOperation, message: impl Into<String>) {
        self.state
            .write()
            .await
            .failures
            .entry(operation)
            .or_default()
            .push_back(message.into());
    }

    /// Deliver an error message to every live subscriber of a collection
    pub async fn fail_subscriptions(&self, collection: Collection, message: impl Into<String>) {
        let message = message.into();
        let mut state = self.state.write().await;
        state.subscribers.retain(|subscriber| {
            if subscriber.query.collection != collection {
                return true;
            }
            subscriber
                .sender
                .send(SubscriptionEvent::Error(StoreError::Injected(message.clone())))
                .is_ok()
        });
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: Collection) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(&collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    fn insert_new(
        &self,
        state: &mut State,
        collection: Collection,
        id: String,
        mut data: Map<String, Value>,
    ) -> DocumentChange {
        data.remove("id");
        stamp_created(&mut data, self.clock.now());
        state.insert(collection, &id, data.clone());
        DocumentChange {
            collection,
            id: id.clone(),
            kind: ChangeKind::Created,
            before: None,
            after: Some(Document::new(id, data)),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(
        &self,
        collection: Collection,
        data: Map<String, Value>,
    ) -> StoreResult<Document> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::Create)?;

        let change = self.insert_new(&mut state, collection, Uuid::now_v7().to_string(), data);
        let created = change.after.clone();
        state.publish(vec![change]);

        debug!(%collection, "document created");
        created.ok_or_else(|| StoreError::Backend("created document missing".to_string()))
    }

    async fn create_with_id(
        &self,
        collection: Collection,
        id: &str,
        data: Map<String, Value>,
    ) -> StoreResult<Document> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::Create)?;

        if state.get(collection, id).is_some() {
            return Err(StoreError::AlreadyExists {
                collection,
                id: id.to_string(),
            });
        }

        let change = self.insert_new(&mut state, collection, id.to_string(), data);
        let created = change.after.clone();
        state.publish(vec![change]);
        created.ok_or_else(|| StoreError::Backend("created document missing".to_string()))
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::Get)?;
        Ok(state.get(collection, id))
    }

    async fn atomic_update(
        &self,
        collection: Collection,
        id: &str,
        update: AtomicUpdate,
    ) -> StoreResult<UpdateOutcome> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::Update)?;

        let before = state.get(collection, id).ok_or_else(|| StoreError::NotFound {
            collection,
            id: id.to_string(),
        })?;

        let applied = apply_update(&before.data, &update, self.clock.now())?;
        state.insert(collection, id, applied.data.clone());
        let outcome = applied.into_outcome(id);

        state.publish(vec![DocumentChange {
            collection,
            id: id.to_string(),
            kind: ChangeKind::Updated,
            before: Some(before),
            after: Some(outcome.document.clone()),
        }]);
        Ok(outcome)
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::Delete)?;

        match state.remove(collection, id) {
            Some(before) => {
                state.publish(vec![DocumentChange {
                    collection,
                    id: id.to_string(),
                    kind: ChangeKind::Deleted,
                    before: Some(before),
                    after: None,
                }]);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::Query)?;
        Ok(query.apply(state.documents(query.collection)))
    }

    async fn commit_batch(&self, batch: WriteBatch) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::CommitBatch)?;

        let mut changes = Vec::with_capacity(batch.len());
        for write in batch.writes {
            match write {
                BatchWrite::Create { collection, data } => {
                    let change =
                        self.insert_new(&mut state, collection, Uuid::now_v7().to_string(), data);
                    changes.push(change);
                }
                BatchWrite::Delete { collection, id } => {
                    if let Some(before) = state.remove(collection, &id) {
                        changes.push(DocumentChange {
                            collection,
                            id,
                            kind: ChangeKind::Deleted,
                            before: Some(before),
                            after: None,
                        });
                    }
                }
            }
        }

        let applied = changes.len();
        state.publish(changes);
        Ok(applied)
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::Subscribe)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let snapshot = query.apply(state.documents(query.collection));
        // Receiver is alive, so the initial send cannot fail.
        let _ = sender.send(SubscriptionEvent::Snapshot(snapshot));
        state.subscribers.push(Subscriber { query, sender });

        Ok(Feed::new(receiver))
    }

    async fn changes(&self, collection: Collection) -> StoreResult<ChangeFeed> {
        let mut state = self.state.write().await;
        state.take_failure(StoreOperation::Subscribe)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        state.watchers.entry(collection).or_default().push(sender);
        Ok(Feed::new(receiver))
    }
}
