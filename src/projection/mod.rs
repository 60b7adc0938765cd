// Copyright (c) 2025 - Cowboy AI, Inc.
//! Client-facing Read Model
//!
//! Each client holds its own projection of the store, rebuilt from pushed
//! snapshots:
//!
//! ```text
//! subscribe(events, createdAt desc) ──Snapshot──▶ replace_events ─┐
//!                                                                ├─▶ watch<ReadModelState>
//! subscribe(comments)               ──Snapshot──▶ replace_comments┘
//! ```
//!
//! Snapshots replace the projected collection wholesale. A subscription
//! error is logged and recorded while the last known good data stays
//! visible. Dropping the [`ReadModel`] (or calling [`ReadModel::stop`])
//! cancels both subscriptions.

pub mod state;
pub mod ticker;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::StoreResult;
use crate::store::{
    Collection, Direction, DocumentStore, Query, Subscription, SubscriptionEvent, CREATED_AT,
};

pub use state::ReadModelState;
pub use ticker::AgeTicker;

/// Query backing the events projection
pub fn events_feed() -> Query {
    Query::collection(Collection::Events).order_by(CREATED_AT, Direction::Descending)
}

/// Live projection of events and comments
#[derive(Debug)]
pub struct ReadModel {
    state: watch::Receiver<ReadModelState>,
    tasks: Vec<JoinHandle<()>>,
}

impl ReadModel {
    /// Subscribe to events and comments and start projecting
    ///
    /// Returns once both subscriptions are established.
    pub async fn start(store: Arc<dyn DocumentStore>) -> StoreResult<Self> {
        let events = store.subscribe(events_feed()).await?;
        let comments = store.subscribe(Query::collection(Collection::Comments)).await?;

        let (sender, receiver) = watch::channel(ReadModelState::new());
        let sender = Arc::new(sender);

        let tasks = vec![
            tokio::spawn(project(events, Collection::Events, sender.clone())),
            tokio::spawn(project(comments, Collection::Comments, sender)),
        ];

        Ok(Self {
            state: receiver,
            tasks,
        })
    }

    /// Current state
    pub fn snapshot(&self) -> ReadModelState {
        self.state.borrow().clone()
    }

    /// Rebuild counter of the current state
    pub fn version(&self) -> u64 {
        self.state.borrow().version()
    }

    /// Most recent subscription error
    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error().map(String::from)
    }

    /// Receiver notified after every rebuild
    pub fn watch(&self) -> watch::Receiver<ReadModelState> {
        self.state.clone()
    }

    /// Wait until the state reaches at least `version`
    pub async fn wait_for_version(&self, version: u64) -> ReadModelState {
        let mut receiver = self.state.clone();
        if receiver
            .wait_for(|state| state.version() >= version)
            .await
            .is_err()
        {
            debug!(version, "read model stopped before reaching version");
        }
        let state = receiver.borrow().clone();
        state
    }

    /// Cancel both subscriptions; the last state stays readable
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for ReadModel {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn project(
    mut subscription: Subscription,
    collection: Collection,
    sender: Arc<watch::Sender<ReadModelState>>,
) {
    while let Some(message) = subscription.next().await {
        match message {
            SubscriptionEvent::Snapshot(docs) => {
                debug!(collection = %collection, documents = docs.len(), "snapshot received");
                sender.send_modify(|state| match collection {
                    Collection::Comments => state.replace_comments(&docs),
                    _ => state.replace_events(&docs),
                });
            }
            SubscriptionEvent::Error(e) => {
                warn!(collection = %collection, error = %e, "subscription error; keeping last known state");
                sender.send_modify(|state| state.record_error(e.to_string()));
            }
        }
    }
}
