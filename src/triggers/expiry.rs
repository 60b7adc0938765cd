// Copyright (c) 2025 - Cowboy AI, Inc.
//! Scheduled expiry of past events

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::aggregate::fields;
use crate::clock::Clock;
use crate::errors::StoreResult;
use crate::store::{Collection, DocumentStore, Query, WriteBatch};

/// Result of one expiry run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryReport {
    /// Events deleted
    pub deleted_count: usize,
}

/// Deletes events dated more than `retention_days` before today
#[derive(Clone)]
pub struct ExpiryJob {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    retention_days: u64,
}

impl ExpiryJob {
    /// Create the job
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, retention_days: u64) -> Self {
        Self {
            store,
            clock,
            retention_days,
        }
    }

    /// Oldest date that is kept
    pub fn cutoff(&self) -> NaiveDate {
        let today = self.clock.now().date_naive();
        today
            .checked_sub_days(Days::new(self.retention_days))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Delete every expired event in one batch
    pub async fn run_once(&self) -> StoreResult<ExpiryReport> {
        let cutoff = self.cutoff().format("%Y-%m-%d").to_string();
        let expired = self
            .store
            .query(&Query::collection(Collection::Events).filter_lt(fields::DATE, json!(cutoff)))
            .await?;

        if expired.is_empty() {
            info!(cutoff = %cutoff, "no expired events");
            return Ok(ExpiryReport { deleted_count: 0 });
        }

        let mut batch = WriteBatch::new();
        for event in &expired {
            batch.delete(Collection::Events, event.id.clone());
        }
        let deleted_count = self.store.commit_batch(batch).await?;

        info!(cutoff = %cutoff, deleted_count, "expired events deleted");
        Ok(ExpiryReport { deleted_count })
    }

    /// Run on a fixed cadence until the handle is aborted; the first run is
    /// immediate
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    error!(error = %e, "expiry run failed");
                }
            }
        })
    }
}
