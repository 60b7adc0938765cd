// Copyright (c) 2025 - Cowboy AI, Inc.
//! New-event notification fan-out
//!
//! One created event becomes one notification document per user who has
//! notifications enabled. All notifications for an event are committed in a
//! single batch. A failed commit is logged and reported, never retried.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};

use crate::aggregate::fields;
use crate::domain::Notification;
use crate::errors::StoreResult;
use crate::store::{encode, Collection, Document, DocumentStore, Query, WriteBatch};

/// Outcome of one fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanoutReport {
    /// Notifications were written
    Sent {
        /// Created event
        event_id: String,
        /// Notifications written (may be zero)
        notified: usize,
    },
    /// The batch was rejected; nothing was written
    Failed {
        /// Created event
        event_id: String,
        /// Store error message
        error: String,
    },
}

impl FanoutReport {
    /// Number of notifications written
    pub fn notified(&self) -> usize {
        match self {
            FanoutReport::Sent { notified, .. } => *notified,
            FanoutReport::Failed { .. } => 0,
        }
    }
}

/// Query for users who opted in to notifications
pub fn interested_users() -> Query {
    Query::collection(Collection::Users).filter_eq(fields::NOTIFICATIONS_ENABLED, json!(true))
}

/// Build the notification batch for an event and its recipients
pub fn notification_batch(event: &Document, recipients: &[Document]) -> StoreResult<WriteBatch> {
    let text = |field: &str| {
        event
            .field(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let title = text(fields::TITLE);
    let location = text(fields::LOCATION);
    let date = text(fields::DATE);

    let mut batch = WriteBatch::new();
    for user in recipients {
        let notification = Notification::new_event(&user.id, &event.id, &title, &location, &date);
        batch.create(Collection::Notifications, encode(&notification)?);
    }
    Ok(batch)
}

/// Notify every interested user about a newly created event
pub async fn fan_out(store: &Arc<dyn DocumentStore>, event: &Document) -> FanoutReport {
    match try_fan_out(store, event).await {
        Ok(notified) => {
            info!(event_id = %event.id, notified, "new-event notifications sent");
            FanoutReport::Sent {
                event_id: event.id.clone(),
                notified,
            }
        }
        Err(e) => {
            error!(event_id = %event.id, error = %e, "notification fan-out failed");
            FanoutReport::Failed {
                event_id: event.id.clone(),
                error: e.to_string(),
            }
        }
    }
}

async fn try_fan_out(store: &Arc<dyn DocumentStore>, event: &Document) -> StoreResult<usize> {
    let recipients = store.query(&interested_users()).await?;
    if recipients.is_empty() {
        return Ok(0);
    }

    let batch = notification_batch(event, &recipients)?;
    store.commit_batch(batch).await
}
