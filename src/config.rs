// Copyright (c) 2025 - Cowboy AI, Inc.

//! Runtime configuration
//!
//! Defaults suit a local NATS server; every value can be overridden through
//! environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `NATS_URL` | `nats.servers` (comma separated) |
//! | `CERCO_CLIENT_NAME` | `nats.name` |
//! | `CERCO_BUCKET_PREFIX` | `buckets.prefix` |
//! | `CERCO_BUCKET_STORAGE` | `buckets.storage` (`file` or `memory`) |
//! | `CERCO_MAX_CAS_RETRIES` | `max_cas_retries` |
//! | `CERCO_EXPIRY_INTERVAL_SECS` | `expiry.interval` |
//! | `CERCO_EXPIRY_RETENTION_DAYS` | `expiry.retention_days` |
//! | `CERCO_REPLAY_INTERVAL_SECS` | `triggers.replay_interval` |
//! | `CERCO_APPLIED_HISTORY` | `triggers.applied_history` |

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::jetstream::{BucketConfig, StorageType};
use crate::nats::NatsConfig;
use crate::triggers::DEFAULT_APPLIED_HISTORY;

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    /// Environment variable
    pub var: String,
    /// Raw value
    pub value: String,
    /// What is wrong with it
    pub reason: String,
}

/// Scheduled expiry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryConfig {
    /// Time between runs (default: daily)
    pub interval: Duration,

    /// Events dated more than this many days ago are deleted
    pub retention_days: u64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            retention_days: 7,
        }
    }
}

/// Trigger service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Time between replays of failed stat effects
    pub replay_interval: Duration,

    /// Applied stat effects kept in the log for inspection
    pub applied_history: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            replay_interval: Duration::from_secs(5 * 60),
            applied_history: DEFAULT_APPLIED_HISTORY,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CercoConfig {
    /// NATS connection
    pub nats: NatsConfig,

    /// KV bucket layout
    pub buckets: BucketConfig,

    /// Compare-and-swap attempts before an update reports a conflict
    pub max_cas_retries: usize,

    /// Expiry job
    pub expiry: ExpiryConfig,

    /// Trigger runner
    pub triggers: TriggerConfig,
}

impl Default for CercoConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig::default(),
            buckets: BucketConfig::default(),
            max_cas_retries: 32,
            expiry: ExpiryConfig::default(),
            triggers: TriggerConfig::default(),
        }
    }
}

impl CercoConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(urls) = lookup("NATS_URL") {
            config.nats.servers = urls
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(name) = lookup("CERCO_CLIENT_NAME") {
            config.nats.name = name;
        }
        if let Some(prefix) = lookup("CERCO_BUCKET_PREFIX") {
            config.buckets.prefix = prefix;
        }
        if let Some(storage) = lookup("CERCO_BUCKET_STORAGE") {
            config.buckets.storage = match storage.to_ascii_lowercase().as_str() {
                "file" => StorageType::File,
                "memory" => StorageType::Memory,
                _ => {
                    return Err(ConfigError {
                        var: "CERCO_BUCKET_STORAGE".to_string(),
                        value: storage,
                        reason: "expected file or memory".to_string(),
                    })
                }
            };
        }
        if let Some(retries) = parse(&lookup, "CERCO_MAX_CAS_RETRIES")? {
            config.max_cas_retries = retries;
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "CERCO_EXPIRY_INTERVAL_SECS")? {
            config.expiry.interval = Duration::from_secs(secs);
        }
        if let Some(days) = parse(&lookup, "CERCO_EXPIRY_RETENTION_DAYS")? {
            config.expiry.retention_days = days;
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "CERCO_REPLAY_INTERVAL_SECS")? {
            config.triggers.replay_interval = Duration::from_secs(secs);
        }
        if let Some(history) = parse(&lookup, "CERCO_APPLIED_HISTORY")? {
            config.triggers.applied_history = history;
        }

        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|e: T::Err| ConfigError {
            var: var.to_string(),
            reason: e.to_string(),
            value,
        }),
    }
}
