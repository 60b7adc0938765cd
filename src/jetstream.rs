// Copyright (c) 2025 - Cowboy AI, Inc.

//! JetStream key-value bucket setup
//!
//! Each collection lives in its own KV bucket named
//! `{prefix}_{collection}`. Keys are document ids, values are the JSON
//! document fields, and the bucket revision drives compare-and-swap updates.
//!
//! # Example
//!
//! ```rust,no_run
//! use cerco_events::jetstream::{open_bucket, BucketConfig};
//! use cerco_events::store::Collection;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = async_nats::connect("nats://localhost:4222").await?;
//!     let jetstream = async_nats::jetstream::new(client);
//!
//!     let config = BucketConfig::default();
//!     let events = open_bucket(&jetstream, &config, Collection::Events).await?;
//!     Ok(())
//! }
//! ```

use async_nats::jetstream::{self, kv};
use serde::{Deserialize, Serialize};

use crate::errors::{StoreError, StoreResult};
use crate::store::Collection;

/// Configuration shared by all collection buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Bucket name prefix
    pub prefix: String,

    /// Revisions kept per key
    pub history: i64,

    /// Storage type (File or Memory)
    pub storage: StorageType,

    /// Number of replicas (for clustered NATS)
    pub replicas: usize,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            prefix: "cerco".to_string(),
            history: 1,
            storage: StorageType::File,
            replicas: 1,
        }
    }
}

impl BucketConfig {
    /// Bucket name for a collection
    pub fn bucket_name(&self, collection: Collection) -> String {
        format!("{}_{}", self.prefix, collection)
    }
}

/// Storage type for JetStream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    /// File-based storage (persistent across restarts)
    File,
    /// Memory-based storage (faster, but lost on restart)
    Memory,
}

/// Open the bucket of a collection, creating it if missing
///
/// Idempotent: an existing bucket is returned as-is.
pub async fn open_bucket(
    jetstream: &jetstream::Context,
    config: &BucketConfig,
    collection: Collection,
) -> StoreResult<kv::Store> {
    let name = config.bucket_name(collection);

    if let Ok(store) = jetstream.get_key_value(&name).await {
        return Ok(store);
    }

    let storage = match config.storage {
        StorageType::File => jetstream::stream::StorageType::File,
        StorageType::Memory => jetstream::stream::StorageType::Memory,
    };

    jetstream
        .create_key_value(kv::Config {
            bucket: name,
            history: config.history,
            storage,
            num_replicas: config.replicas,
            ..Default::default()
        })
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))
}
