// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS JetStream key-value document store
//!
//! One KV bucket per collection; the key is the document id and the value is
//! the JSON document fields.
//!
//! # Atomicity
//!
//! Updates use the bucket revision as an optimistic lock:
//!
//! ```text
//! entry(id) → apply_update → update(id, bytes, revision)
//!     ↑                               ↓ revision moved
//!     └────────── retry ──────────────┘ (up to max_cas_retries)
//! ```
//!
//! # Notifications
//!
//! Snapshot subscriptions are served from the bucket watcher. Every
//! committed change is also published as a [`DocumentChange`] on
//! `cerco.{collection}.{kind}` for the change feed.

use std::collections::HashMap;
use std::sync::Arc;

use async_nats::jetstream::kv;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    apply_update, stamp_created, AtomicUpdate, BatchWrite, ChangeFeed, ChangeKind, Collection,
    Document, DocumentChange, DocumentStore, Feed, Query, Subscription, SubscriptionEvent,
    UpdateOutcome, WriteBatch,
};
use crate::clock::{Clock, SystemClock};
use crate::config::CercoConfig;
use crate::errors::{StoreError, StoreResult};
use crate::jetstream::{open_bucket, BucketConfig};
use crate::nats::NatsClient;

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn decode_fields(bytes: &[u8]) -> StoreResult<Map<String, Value>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// [`DocumentStore`] backed by NATS JetStream KV buckets
#[derive(Clone)]
pub struct NatsDocumentStore {
    client: NatsClient,
    buckets: Arc<HashMap<Collection, kv::Store>>,
    clock: Arc<dyn Clock>,
    max_cas_retries: usize,
}

impl NatsDocumentStore {
    /// Connect to NATS and open every collection bucket
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the server or a bucket is unavailable
    pub async fn connect(config: &CercoConfig) -> StoreResult<Self> {
        let client = NatsClient::new(&config.nats).await?;
        Self::open(
            client,
            &config.buckets,
            config.max_cas_retries,
            Arc::new(SystemClock),
        )
        .await
    }

    /// Open every collection bucket on an existing connection
    pub async fn open(
        client: NatsClient,
        config: &BucketConfig,
        max_cas_retries: usize,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let jetstream = client.jetstream();
        let mut buckets = HashMap::new();
        for collection in Collection::ALL {
            let bucket = open_bucket(&jetstream, config, collection).await?;
            buckets.insert(collection, bucket);
        }

        Ok(Self {
            client,
            buckets: Arc::new(buckets),
            clock,
            max_cas_retries: max_cas_retries.max(1),
        })
    }

    fn bucket(&self, collection: Collection) -> StoreResult<&kv::Store> {
        self.buckets
            .get(&collection)
            .ok_or_else(|| StoreError::Backend(format!("bucket for {} not open", collection)))
    }

    /// Current document and its revision; deleted or purged keys are absent
    async fn read(&self, collection: Collection, id: &str) -> StoreResult<Option<(Document, u64)>> {
        let entry = self.bucket(collection)?.entry(id).await.map_err(backend)?;
        match entry {
            Some(entry) if matches!(entry.operation, kv::Operation::Put) => {
                let data = decode_fields(&entry.value)?;
                Ok(Some((Document::new(id, data), entry.revision)))
            }
            _ => Ok(None),
        }
    }

    async fn load_all(&self, collection: Collection) -> StoreResult<Vec<(Document, u64)>> {
        let mut keys = self.bucket(collection)?.keys().await.map_err(backend)?;
        let mut docs = Vec::new();
        while let Some(key) = keys.next().await {
            let key = key.map_err(backend)?;
            if let Some(found) = self.read(collection, &key).await? {
                docs.push(found);
            }
        }
        Ok(docs)
    }

    /// Publish a committed change; the write has already happened, so a
    /// failed publish is only logged
    async fn announce(&self, change: DocumentChange) {
        if let Err(e) = self.client.publish_change(&change).await {
            warn!(collection = %change.collection, id = %change.id, error = %e, "failed to publish document change");
        }
    }

    async fn put_new(
        &self,
        collection: Collection,
        id: &str,
        mut data: Map<String, Value>,
    ) -> StoreResult<Document> {
        data.remove("id");
        stamp_created(&mut data, self.clock.now());
        let bytes = serde_json::to_vec(&data)?;
        let bucket = self.bucket(collection)?;

        // Expected revision 0 only matches a key that was never written
        if let Err(e) = bucket.update(id, bytes.clone().into(), 0).await {
            // A deleted key keeps its marker; write over it only if it is still the latest entry
            match bucket.entry(id).await.map_err(backend)? {
                Some(entry) if !matches!(entry.operation, kv::Operation::Put) => {
                    bucket
                        .update(id, bytes.into(), entry.revision)
                        .await
                        .map_err(backend)?;
                }
                _ => return Err(backend(e)),
            }
        }
        Ok(Document::new(id, data))
    }

    async fn undo(&self, applied: &[DocumentChange]) {
        for change in applied.iter().rev() {
            let result = match (change.kind, &change.before) {
                (ChangeKind::Created, _) => match self.bucket(change.collection) {
                    Ok(bucket) => bucket.delete(&change.id).await.map_err(backend),
                    Err(e) => Err(e),
                },
                (ChangeKind::Deleted, Some(before)) => self.restore(change.collection, before).await,
                _ => Ok(()),
            };
            if let Err(e) = result {
                warn!(collection = %change.collection, id = %change.id, error = %e, "batch compensation failed");
            }
        }
    }

    async fn delete_for_batch(
        &self,
        collection: Collection,
        id: String,
    ) -> StoreResult<Option<DocumentChange>> {
        let Some((before, _)) = self.read(collection, &id).await? else {
            return Ok(None);
        };
        self.bucket(collection)?.delete(&id).await.map_err(backend)?;
        Ok(Some(DocumentChange {
            collection,
            id,
            kind: ChangeKind::Deleted,
            before: Some(before),
            after: None,
        }))
    }

    async fn restore(&self, collection: Collection, doc: &Document) -> StoreResult<()> {
        let bytes = serde_json::to_vec(&doc.data)?;
        self.bucket(collection)?
            .put(&doc.id, bytes.into())
            .await
            .map_err(backend)?;
        Ok(())
    }
}

/// Subscription-local copy of one bucket, kept current from its watcher
struct WatchedCollection {
    query: Query,
    revisions: HashMap<String, u64>,
    cache: HashMap<String, Map<String, Value>>,
}

impl WatchedCollection {
    fn new(query: Query, loaded: Vec<(Document, u64)>) -> Self {
        let mut revisions = HashMap::new();
        let mut cache = HashMap::new();
        for (doc, revision) in loaded {
            revisions.insert(doc.id.clone(), revision);
            cache.insert(doc.id, doc.data);
        }
        Self {
            query,
            revisions,
            cache,
        }
    }

    fn snapshot(&self) -> Vec<Document> {
        self.query.apply(
            self.cache
                .iter()
                .map(|(id, data)| Document::new(id.clone(), data.clone())),
        )
    }

    /// Fold one watched revision in; `value` is `None` for deletes and purges.
    /// Returns `None` for revisions already covered by the initial load.
    fn apply(
        &mut self,
        key: &str,
        revision: u64,
        value: Option<&[u8]>,
    ) -> Option<SubscriptionEvent> {
        let seen = self.revisions.get(key).copied().unwrap_or(0);
        if revision <= seen {
            return None;
        }
        self.revisions.insert(key.to_string(), revision);

        match value {
            Some(bytes) => match decode_fields(bytes) {
                Ok(data) => {
                    self.cache.insert(key.to_string(), data);
                }
                Err(e) => return Some(SubscriptionEvent::Error(e)),
            },
            None => {
                self.cache.remove(key);
            }
        }
        Some(SubscriptionEvent::Snapshot(self.snapshot()))
    }
}

#[async_trait]
impl DocumentStore for NatsDocumentStore {
    async fn create(
        &self,
        collection: Collection,
        data: Map<String, Value>,
    ) -> StoreResult<Document> {
        let id = Uuid::now_v7().to_string();
        let doc = self.put_new(collection, &id, data).await?;

        debug!(%collection, %id, "document created");
        self.announce(DocumentChange {
            collection,
            id,
            kind: ChangeKind::Created,
            before: None,
            after: Some(doc.clone()),
        })
        .await;
        Ok(doc)
    }

    async fn create_with_id(
        &self,
        collection: Collection,
        id: &str,
        data: Map<String, Value>,
    ) -> StoreResult<Document> {
        let already_exists = || StoreError::AlreadyExists {
            collection,
            id: id.to_string(),
        };

        if self.read(collection, id).await?.is_some() {
            return Err(already_exists());
        }

        let doc = match self.put_new(collection, id, data).await {
            Ok(doc) => doc,
            Err(e) => {
                // Lost a race with another creator of the same id
                if self.read(collection, id).await?.is_some() {
                    return Err(already_exists());
                }
                return Err(e);
            }
        };

        self.announce(DocumentChange {
            collection,
            id: id.to_string(),
            kind: ChangeKind::Created,
            before: None,
            after: Some(doc.clone()),
        })
        .await;
        Ok(doc)
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.read(collection, id).await?.map(|(doc, _)| doc))
    }

    async fn atomic_update(
        &self,
        collection: Collection,
        id: &str,
        update: AtomicUpdate,
    ) -> StoreResult<UpdateOutcome> {
        let not_found = || StoreError::NotFound {
            collection,
            id: id.to_string(),
        };

        for attempt in 1..=self.max_cas_retries {
            let (before, revision) = self.read(collection, id).await?.ok_or_else(not_found)?;
            let applied = apply_update(&before.data, &update, self.clock.now())?;
            let bytes = serde_json::to_vec(&applied.data)?;

            match self.bucket(collection)?.update(id, bytes.into(), revision).await {
                Ok(_) => {
                    let outcome = applied.into_outcome(id);
                    self.announce(DocumentChange {
                        collection,
                        id: id.to_string(),
                        kind: ChangeKind::Updated,
                        before: Some(before),
                        after: Some(outcome.document.clone()),
                    })
                    .await;
                    return Ok(outcome);
                }
                Err(e) => match self.read(collection, id).await? {
                    None => return Err(not_found()),
                    Some((_, current)) if current != revision => {
                        debug!(%collection, %id, attempt, "revision moved, retrying update");
                    }
                    Some(_) => return Err(backend(e)),
                },
            }
        }

        warn!(%collection, %id, attempts = self.max_cas_retries, "giving up on contended update");
        Err(StoreError::Conflict {
            collection,
            id: id.to_string(),
            attempts: self.max_cas_retries,
        })
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        let Some((before, _)) = self.read(collection, id).await? else {
            return Ok(false);
        };

        self.bucket(collection)?.delete(id).await.map_err(backend)?;
        self.announce(DocumentChange {
            collection,
            id: id.to_string(),
            kind: ChangeKind::Deleted,
            before: Some(before),
            after: None,
        })
        .await;
        Ok(true)
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let docs = self.load_all(query.collection).await?;
        Ok(query.apply(docs.into_iter().map(|(doc, _)| doc)))
    }

    async fn commit_batch(&self, batch: WriteBatch) -> StoreResult<usize> {
        let mut applied: Vec<DocumentChange> = Vec::with_capacity(batch.len());

        for write in batch.writes {
            let result = match write {
                BatchWrite::Create { collection, data } => {
                    let id = Uuid::now_v7().to_string();
                    self.put_new(collection, &id, data).await.map(|doc| {
                        Some(DocumentChange {
                            collection,
                            id,
                            kind: ChangeKind::Created,
                            before: None,
                            after: Some(doc),
                        })
                    })
                }
                BatchWrite::Delete { collection, id } => self.delete_for_batch(collection, id).await,
            };

            match result {
                Ok(Some(change)) => applied.push(change),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, written = applied.len(), "batch write failed, compensating");
                    self.undo(&applied).await;
                    return Err(e);
                }
            }
        }

        let count = applied.len();
        for change in applied {
            self.announce(change).await;
        }
        Ok(count)
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        let collection = query.collection;
        let bucket = self.bucket(collection)?.clone();
        let store = self.clone();
        let (sender, receiver) = mpsc::unbounded_channel();
        let (ready, started) = oneshot::channel();

        let task = tokio::spawn(async move {
            // Watch before loading so nothing committed in between is missed.
            // A failed startup report means subscribe was cancelled.
            let mut watch = match bucket.watch_all().await {
                Ok(watch) => watch,
                Err(e) => {
                    let _ = ready.send(Err(backend(e)));
                    return;
                }
            };
            let mut watched = match store.load_all(collection).await {
                Ok(loaded) => WatchedCollection::new(query, loaded),
                Err(e) => {
                    let _ = ready.send(Err(e));
                    return;
                }
            };

            // Receiver is held by subscribe until startup is reported, so the
            // initial send cannot fail.
            let _ = sender.send(SubscriptionEvent::Snapshot(watched.snapshot()));
            if ready.send(Ok(())).is_err() {
                return;
            }

            while let Some(item) = watch.next().await {
                let message = match item {
                    Ok(entry) => {
                        let value = matches!(entry.operation, kv::Operation::Put)
                            .then_some(&entry.value[..]);
                        match watched.apply(&entry.key, entry.revision, value) {
                            Some(message) => message,
                            None => continue,
                        }
                    }
                    Err(e) => SubscriptionEvent::Error(backend(e)),
                };

                if sender.send(message).is_err() {
                    break;
                }
            }
            debug!(%collection, "snapshot subscription closed");
        });

        match started.await {
            Ok(Ok(())) => Ok(Feed::with_task(receiver, task)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(StoreError::Backend(format!(
                "{} subscription ended before its first snapshot",
                collection
            ))),
        }
    }

    async fn changes(&self, collection: Collection) -> StoreResult<ChangeFeed> {
        let mut subscriber = self.client.change_subscriber(collection).await?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                match serde_json::from_slice::<DocumentChange>(&message.payload) {
                    Ok(change) => {
                        if sender.send(change).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(subject = %message.subject, error = %e, "undecodable document change");
                    }
                }
            }
        });

        Ok(Feed::with_task(receiver, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Direction, CREATED_AT};
    use serde_json::json;

    fn feed() -> Query {
        Query::collection(Collection::Events).order_by(CREATED_AT, Direction::Ascending)
    }

    fn loaded(id: &str, created_at: i64, revision: u64) -> (Document, u64) {
        let data = json!({"createdAt": created_at}).as_object().cloned().unwrap();
        (Document::new(id, data), revision)
    }

    fn ids(event: Option<SubscriptionEvent>) -> Vec<String> {
        match event {
            Some(SubscriptionEvent::Snapshot(docs)) => docs.into_iter().map(|d| d.id).collect(),
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_watched_revisions_from_initial_load_are_skipped() {
        let mut watched = WatchedCollection::new(feed(), vec![loaded("a", 1, 5)]);
        assert!(watched.apply("a", 5, Some(&br#"{"createdAt": 1}"#[..])).is_none());
        assert!(watched.apply("a", 3, None).is_none());
        assert_eq!(watched.snapshot().len(), 1);
    }

    #[test]
    fn test_watched_puts_and_deletes_update_snapshot() {
        let mut watched = WatchedCollection::new(feed(), vec![loaded("b", 2, 5)]);

        let event = watched.apply("a", 6, Some(&br#"{"createdAt": 1}"#[..]));
        assert_eq!(ids(event), vec!["a", "b"]);

        let event = watched.apply("b", 7, None);
        assert_eq!(ids(event), vec!["a"]);
    }

    #[test]
    fn test_undecodable_watched_value_is_reported() {
        let mut watched = WatchedCollection::new(feed(), Vec::new());
        let event = watched.apply("a", 1, Some(&b"not json"[..]));
        assert!(matches!(event, Some(SubscriptionEvent::Error(_))));
        assert!(watched.snapshot().is_empty());
    }

    async fn connect() -> NatsDocumentStore {
        let mut config = CercoConfig::default();
        config.buckets.prefix = format!("cerco_test_{}", Uuid::now_v7().simple());
        config.buckets.storage = crate::jetstream::StorageType::Memory;
        NatsDocumentStore::connect(&config).await.unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires NATS server with JetStream
    async fn test_create_update_delete() {
        let store = connect().await;
        let doc = store
            .create(Collection::Events, json!({"likes": 0}).as_object().cloned().unwrap())
            .await
            .unwrap();

        let outcome = store
            .atomic_update(
                Collection::Events,
                &doc.id,
                AtomicUpdate::new().toggle_membership("likesList", "likes", json!("u1")),
            )
            .await
            .unwrap();
        assert_eq!(outcome.document.data.get("likes"), Some(&json!(1)));

        assert!(store.delete(Collection::Events, &doc.id).await.unwrap());
        assert!(store.get(Collection::Events, &doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires NATS server with JetStream
    async fn test_create_with_id_reuses_deleted_key() {
        let store = connect().await;
        store
            .create_with_id(Collection::Users, "u1", Map::new())
            .await
            .unwrap();
        assert!(matches!(
            store.create_with_id(Collection::Users, "u1", Map::new()).await,
            Err(StoreError::AlreadyExists { .. })
        ));

        assert!(store.delete(Collection::Users, "u1").await.unwrap());
        store
            .create_with_id(Collection::Users, "u1", Map::new())
            .await
            .unwrap();
        assert!(store.get(Collection::Users, "u1").await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore] // Requires NATS server with JetStream
    async fn test_subscription_sees_initial_and_later_writes() {
        let store = connect().await;
        store.create(Collection::Events, Map::new()).await.unwrap();

        let mut subscription = store.subscribe(feed()).await.unwrap();
        assert!(matches!(
            subscription.next().await,
            Some(SubscriptionEvent::Snapshot(docs)) if docs.len() == 1
        ));

        store.create(Collection::Events, Map::new()).await.unwrap();
        assert!(matches!(
            subscription.next().await,
            Some(SubscriptionEvent::Snapshot(docs)) if docs.len() == 2
        ));
    }

    #[tokio::test]
    #[ignore] // Requires NATS server with JetStream
    async fn test_concurrent_increments_are_not_lost() {
        let store = connect().await;
        let doc = store.create(Collection::Events, Map::new()).await.unwrap();

        let mut handles = Vec::new();
        for n in 0..10 {
            let store = store.clone();
            let id = doc.id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .atomic_update(
                        Collection::Events,
                        &id,
                        AtomicUpdate::new()
                            .add_to_set("attendeesList", json!(format!("user-{}", n)))
                            .increment("attendees", 1),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.get(Collection::Events, &doc.id).await.unwrap().unwrap();
        assert_eq!(stored.data.get("attendees"), Some(&json!(10)));
    }
}
