// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS connection shared by the KV buckets and the change feed
//!
//! Document changes travel as JSON on `cerco.<collection>.<kind>`; see
//! [`crate::subjects`].

use std::time::Duration;

use async_nats::{jetstream, Client, ConnectOptions, Subscriber};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{StoreError, StoreResult};
use crate::store::{Collection, DocumentChange};
use crate::subjects::{change_subject, collection_wildcard};

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NatsConfig {
    /// Server URLs, tried in order
    pub servers: Vec<String>,
    /// Client name reported to the server
    pub name: String,
    /// Give up connecting after this long
    pub connect_timeout: Duration,
    /// Timeout for request/reply, including KV operations
    pub request_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "cerco-events".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Connected NATS client
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to the configured servers
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if no server is reachable
    pub async fn new(config: &NatsConfig) -> StoreResult<Self> {
        let options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout)
            .request_timeout(Some(config.request_timeout));

        let client = async_nats::connect_with_options(config.servers.join(","), options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(servers = ?config.servers, name = %config.name, "connected to NATS");
        Ok(Self { client })
    }

    /// Publish a committed change on its collection/kind subject
    pub async fn publish_change(&self, change: &DocumentChange) -> StoreResult<()> {
        let subject = change_subject(change.collection, change.kind);
        let payload = serde_json::to_vec(change)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        debug!(%subject, id = %change.id, "document change published");
        Ok(())
    }

    /// Subscribe to every change of one collection
    pub async fn change_subscriber(&self, collection: Collection) -> StoreResult<Subscriber> {
        let subject = collection_wildcard(collection);
        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        debug!(%subject, "subscribed to document changes");
        Ok(subscriber)
    }

    /// JetStream context on this connection
    pub fn jetstream(&self) -> jetstream::Context {
        jetstream::new(self.client.clone())
    }
}
