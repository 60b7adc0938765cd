// Copyright (c) 2025 - Cowboy AI, Inc.
//! Server-side Triggers
//!
//! Reactions to committed event changes, run out of band from the write
//! that caused them:
//!
//! ```text
//! events change feed ──▶ TriggerRunner
//!                          ├─ Created ─▶ fan_out()            (notifications)
//!                          │          └▶ IncrementHosted       (side-effect log)
//!                          └─ Updated ─▶ IncrementAttended     (side-effect log)
//!
//! ExpiryJob ── interval ──▶ delete events past retention
//! ```
//!
//! Trigger failures are logged and never undo the event write.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::StoreResult;
use crate::store::{ChangeKind, Collection, DocumentChange, DocumentStore};

pub mod expiry;
pub mod notifications;
pub mod side_effects;
pub mod stats;

pub use expiry::{ExpiryJob, ExpiryReport};
pub use notifications::{fan_out, FanoutReport};
pub use side_effects::{
    EffectRecord, EffectStatus, ExecutionReport, ExecutorError, SideEffectExecutor, SideEffectLog,
    StoreEffectExecutor, DEFAULT_APPLIED_HISTORY,
};
pub use stats::{newly_attending, project_change, StatEffect};

/// What a single change triggered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// Fan-out result for created events
    pub fanout: Option<FanoutReport>,
    /// Stat effects recorded
    pub effects: usize,
    /// Effects executed in this round
    pub execution: ExecutionReport,
}

/// Dispatches event changes to the fan-out and stat triggers
#[derive(Clone)]
pub struct TriggerRunner {
    store: Arc<dyn DocumentStore>,
    executor: Arc<dyn SideEffectExecutor>,
    log: SideEffectLog,
}

impl TriggerRunner {
    /// Runner applying stat effects to `store`
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let executor = Arc::new(StoreEffectExecutor::new(store.clone()));
        Self::with_executor(store, executor)
    }

    /// Runner with a custom stat executor
    pub fn with_executor(store: Arc<dyn DocumentStore>, executor: Arc<dyn SideEffectExecutor>) -> Self {
        Self {
            store,
            executor,
            log: SideEffectLog::new(),
        }
    }

    /// Replace the side-effect log, e.g. to change its applied history
    pub fn with_log(mut self, log: SideEffectLog) -> Self {
        self.log = log;
        self
    }

    /// The side-effect log shared by every clone of this runner
    pub fn side_effects(&self) -> &SideEffectLog {
        &self.log
    }

    /// Retry every failed stat effect
    pub async fn replay_failed(&self) -> ExecutionReport {
        self.log.replay_failed(self.executor.as_ref()).await
    }

    /// Replay failed stat effects on a fixed cadence until the handle is
    /// aborted
    pub fn spawn_replay(&self, every: Duration) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; nothing has failed yet
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let report = runner.replay_failed().await;
                if report.applied + report.failed > 0 {
                    info!(applied = report.applied, failed = report.failed, "failed stat effects replayed");
                }
            }
        })
    }

    /// Handle one committed change of the events collection
    pub async fn handle_change(&self, change: &DocumentChange) -> TriggerOutcome {
        let mut outcome = TriggerOutcome::default();
        if change.collection != Collection::Events {
            return outcome;
        }

        if let (ChangeKind::Created, Some(event)) = (change.kind, &change.after) {
            outcome.fanout = Some(fan_out(&self.store, event).await);
        }

        let effects = project_change(change);
        outcome.effects = effects.len();
        if effects.is_empty() {
            return outcome;
        }
        let mut ids = Vec::with_capacity(effects.len());
        for effect in effects {
            ids.push(self.log.enqueue(effect).await);
        }
        outcome.execution = self.log.apply(&ids, self.executor.as_ref()).await;

        if outcome.execution.failed > 0 {
            warn!(
                event_id = %change.id,
                failed = outcome.execution.failed,
                "stat effects failed; kept for replay"
            );
        }
        outcome
    }

    /// Subscribe to the events change feed and process changes in the
    /// background until the handle is aborted or the feed closes
    ///
    /// The subscription is established before this returns, so changes
    /// committed afterwards are never missed.
    pub async fn spawn(self) -> StoreResult<JoinHandle<()>> {
        let mut feed = self.store.changes(Collection::Events).await?;
        info!("trigger runner subscribed to event changes");

        Ok(tokio::spawn(async move {
            while let Some(change) = feed.next().await {
                debug!(event_id = %change.id, kind = %change.kind, "event change received");
                self.handle_change(&change).await;
            }
            info!("event change feed closed; trigger runner stopped");
        }))
    }

    /// Process changes on the current task until the feed closes
    pub async fn run(self) -> StoreResult<()> {
        let mut feed = self.store.changes(Collection::Events).await?;
        while let Some(change) = feed.next().await {
            self.handle_change(&change).await;
        }
        Ok(())
    }
}
