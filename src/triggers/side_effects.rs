// Copyright (c) 2025 - Cowboy AI, Inc.
//! Side Effect Log and Executor
//!
//! Stat effects are not transactionally linked to the event write that
//! caused them. Instead of firing them and forgetting, every effect is
//! recorded in a [`SideEffectLog`] and moves through:
//!
//! ```text
//! Pending ──claim──▶ Running ──execute ok──▶ Applied
//!                       │
//!                       └──execute err──▶ Failed { error, attempts } ──replay_failed──▶ Running ...
//! ```
//!
//! Records are claimed under the log lock, so clones of the same log never
//! execute one effect twice. Only the most recent applied records are kept;
//! pending, running and failed records stay until they are applied.
//!
//! The event mutation is never rolled back when an effect fails.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::stats::StatEffect;
use crate::aggregate::fields;
use crate::errors::StoreError;
use crate::store::{timestamp_value, AtomicUpdate, Collection, DocumentStore};

/// Errors that can occur during side effect execution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutorError {
    /// Store rejected the update
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Trait for executing stat effects
#[async_trait]
pub trait SideEffectExecutor: Send + Sync {
    /// Perform one effect
    async fn execute(&self, effect: &StatEffect) -> Result<(), ExecutorError>;
}

/// Applies stat effects to the `users` collection
#[derive(Clone)]
pub struct StoreEffectExecutor {
    store: Arc<dyn DocumentStore>,
}

impl StoreEffectExecutor {
    /// Create an executor writing to `store`
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SideEffectExecutor for StoreEffectExecutor {
    async fn execute(&self, effect: &StatEffect) -> Result<(), ExecutorError> {
        let (counter, stamp, at) = match effect {
            StatEffect::IncrementHosted { at, .. } => {
                (fields::EVENTS_HOSTED, fields::LAST_EVENT_CREATED, at)
            }
            StatEffect::IncrementAttended { at, .. } => {
                (fields::EVENTS_ATTENDED, fields::LAST_EVENT_ATTENDED, at)
            }
        };

        let update = AtomicUpdate::new()
            .increment(counter, 1)
            .set(stamp, timestamp_value(*at))
            .touch();

        self.store
            .atomic_update(Collection::Users, effect.user_id(), update)
            .await?;
        Ok(())
    }
}

/// Lifecycle of a logged effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectStatus {
    /// Recorded, not yet executed
    Pending,
    /// Claimed by an executor
    Running {
        /// Attempts finished before this one
        attempts: u32,
    },
    /// Executed successfully
    Applied,
    /// Last execution failed
    Failed {
        /// Error of the last attempt
        error: String,
        /// Attempts so far
        attempts: u32,
    },
}

/// One logged effect
#[derive(Debug, Clone, PartialEq)]
pub struct EffectRecord {
    /// Sequence number in the log
    pub id: u64,
    /// The effect
    pub effect: StatEffect,
    /// Current status
    pub status: EffectStatus,
}

impl EffectRecord {
    /// Attempts made so far
    pub fn attempts(&self) -> u32 {
        match &self.status {
            EffectStatus::Pending => 0,
            EffectStatus::Running { attempts } => *attempts,
            EffectStatus::Applied => 1,
            EffectStatus::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Outcome of executing a set of logged effects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Effects now applied
    pub applied: usize,
    /// Effects that failed this round
    pub failed: usize,
}

/// Applied records kept by default
pub const DEFAULT_APPLIED_HISTORY: usize = 256;

#[derive(Debug, Default)]
struct LogState {
    next_id: u64,
    records: BTreeMap<u64, EffectRecord>,
    applied: VecDeque<u64>,
}

impl LogState {
    /// Mark every selected record as running and hand back copies
    fn claim<F>(&mut self, select: F) -> Vec<EffectRecord>
    where
        F: Fn(&EffectRecord) -> bool,
    {
        let mut claimed = Vec::new();
        for record in self.records.values_mut().filter(|record| select(record)) {
            record.status = EffectStatus::Running {
                attempts: record.attempts(),
            };
            claimed.push(record.clone());
        }
        claimed
    }

    fn finish(&mut self, id: u64, status: EffectStatus, history: usize) {
        let applied = matches!(status, EffectStatus::Applied);
        if let Some(record) = self.records.get_mut(&id) {
            record.status = status;
        }
        if applied {
            self.applied.push_back(id);
            while self.applied.len() > history {
                if let Some(oldest) = self.applied.pop_front() {
                    self.records.remove(&oldest);
                }
            }
        }
    }
}

/// Shared log of stat effects
#[derive(Debug, Clone)]
pub struct SideEffectLog {
    state: Arc<Mutex<LogState>>,
    history: usize,
}

impl Default for SideEffectLog {
    fn default() -> Self {
        Self::with_history(DEFAULT_APPLIED_HISTORY)
    }
}

impl SideEffectLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty log keeping at most `history` applied records
    pub fn with_history(history: usize) -> Self {
        Self {
            state: Arc::default(),
            history,
        }
    }

    /// Record an effect as pending; returns its id
    pub async fn enqueue(&self, effect: StatEffect) -> u64 {
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;
        state.records.insert(
            id,
            EffectRecord {
                id,
                effect,
                status: EffectStatus::Pending,
            },
        );
        id
    }

    /// Snapshot of every retained record, oldest first
    pub async fn records(&self) -> Vec<EffectRecord> {
        self.state.lock().await.records.values().cloned().collect()
    }

    /// Records that are still pending
    pub async fn pending(&self) -> Vec<EffectRecord> {
        self.filtered(|status| matches!(status, EffectStatus::Pending))
            .await
    }

    /// Records whose last attempt failed
    pub async fn failed(&self) -> Vec<EffectRecord> {
        self.filtered(|status| matches!(status, EffectStatus::Failed { .. }))
            .await
    }

    /// Execute every pending effect
    pub async fn apply_pending(&self, executor: &dyn SideEffectExecutor) -> ExecutionReport {
        let claimed = self
            .state
            .lock()
            .await
            .claim(|record| matches!(record.status, EffectStatus::Pending));
        self.run(claimed, executor).await
    }

    /// Execute the given effects if they are still pending
    pub async fn apply(&self, ids: &[u64], executor: &dyn SideEffectExecutor) -> ExecutionReport {
        let claimed = self.state.lock().await.claim(|record| {
            matches!(record.status, EffectStatus::Pending) && ids.contains(&record.id)
        });
        self.run(claimed, executor).await
    }

    /// Execute every failed effect again
    pub async fn replay_failed(&self, executor: &dyn SideEffectExecutor) -> ExecutionReport {
        let claimed = self
            .state
            .lock()
            .await
            .claim(|record| matches!(record.status, EffectStatus::Failed { .. }));
        self.run(claimed, executor).await
    }

    async fn filtered<F>(&self, keep: F) -> Vec<EffectRecord>
    where
        F: Fn(&EffectStatus) -> bool,
    {
        self.state
            .lock()
            .await
            .records
            .values()
            .filter(|record| keep(&record.status))
            .cloned()
            .collect()
    }

    async fn run(&self, records: Vec<EffectRecord>, executor: &dyn SideEffectExecutor) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for record in records {
            let result = executor.execute(&record.effect).await;
            let status = match result {
                Ok(()) => {
                    debug!(effect_id = record.id, user_id = %record.effect.user_id(), "stat effect applied");
                    report.applied += 1;
                    EffectStatus::Applied
                }
                Err(e) => {
                    let attempts = record.attempts() + 1;
                    warn!(
                        effect_id = record.id,
                        user_id = %record.effect.user_id(),
                        attempts,
                        error = %e,
                        "stat effect failed"
                    );
                    report.failed += 1;
                    EffectStatus::Failed {
                        error: e.to_string(),
                        attempts,
                    }
                }
            };
            self.state
                .lock()
                .await
                .finish(record.id, status, self.history);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryDocumentStore, StoreOperation};
    use chrono::{DateTime, Utc};
    use serde_json::{json, Map, Value};

    fn empty_user_stats() -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(fields::EVENTS_HOSTED.to_string(), json!(0));
        data.insert(fields::EVENTS_ATTENDED.to_string(), json!(0));
        data
    }

    fn hosted(user_id: &str) -> StatEffect {
        StatEffect::IncrementHosted {
            user_id: user_id.into(),
            event_id: "e1".into(),
            at: DateTime::<Utc>::from_timestamp_micros(42).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_applied_effect_updates_user() {
        let store = InMemoryDocumentStore::new();
        store
            .create_with_id(Collection::Users, "host", empty_user_stats())
            .await
            .unwrap();
        let executor = StoreEffectExecutor::new(Arc::new(store.clone()));
        let log = SideEffectLog::new();

        log.enqueue(hosted("host")).await;
        let report = log.apply_pending(&executor).await;

        assert_eq!(report, ExecutionReport { applied: 1, failed: 0 });
        let user = store.get(Collection::Users, "host").await.unwrap().unwrap();
        assert_eq!(user.data.get(fields::EVENTS_HOSTED), Some(&json!(1)));
        assert_eq!(user.data.get(fields::LAST_EVENT_CREATED), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_failed_effect_is_replayable() {
        let store = InMemoryDocumentStore::new();
        store
            .create_with_id(Collection::Users, "host", empty_user_stats())
            .await
            .unwrap();
        store.fail_next(StoreOperation::Update, "timeout").await;
        let executor = StoreEffectExecutor::new(Arc::new(store.clone()));
        let log = SideEffectLog::new();

        log.enqueue(hosted("host")).await;
        assert_eq!(log.apply_pending(&executor).await.failed, 1);

        let failed = log.failed().await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].attempts(), 1);

        assert_eq!(log.replay_failed(&executor).await.applied, 1);
        assert!(log.failed().await.is_empty());
    }

    /// Counts executions and holds each one open briefly
    #[derive(Default)]
    struct SlowCounter {
        executions: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl SideEffectExecutor for SlowCounter {
        async fn execute(&self, _effect: &StatEffect) -> Result<(), ExecutorError> {
            self.executions
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_clones_never_execute_an_effect_twice() {
        let log = SideEffectLog::new();
        let other = log.clone();
        let executor = Arc::new(SlowCounter::default());

        log.enqueue(hosted("a")).await;
        other.enqueue(hosted("b")).await;

        let (first, second) = tokio::join!(
            log.apply_pending(executor.as_ref()),
            other.apply_pending(executor.as_ref())
        );

        assert_eq!(first.applied + second.applied, 2);
        assert_eq!(executor.executions.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_apply_runs_only_the_given_ids() {
        let log = SideEffectLog::new();
        let executor = SlowCounter::default();

        let mine = log.enqueue(hosted("a")).await;
        log.enqueue(hosted("b")).await;

        assert_eq!(log.apply(&[mine], &executor).await.applied, 1);
        let pending = log.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].effect.user_id(), "b");
    }

    #[tokio::test]
    async fn test_applied_history_is_bounded() {
        let log = SideEffectLog::with_history(2);
        let executor = SlowCounter::default();

        for user in ["a", "b", "c", "d"] {
            log.enqueue(hosted(user)).await;
        }
        assert_eq!(log.apply_pending(&executor).await.applied, 4);

        let kept: Vec<u64> = log.records().await.iter().map(|record| record.id).collect();
        assert_eq!(kept, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_failed_records_survive_history_limit() {
        let store = InMemoryDocumentStore::new();
        let executor = StoreEffectExecutor::new(Arc::new(store.clone()));
        let log = SideEffectLog::with_history(0);

        log.enqueue(hosted("ghost")).await;
        log.apply_pending(&executor).await;
        assert_eq!(log.failed().await.len(), 1);

        store
            .create_with_id(Collection::Users, "ghost", empty_user_stats())
            .await
            .unwrap();
        assert_eq!(log.replay_failed(&executor).await.applied, 1);
        assert!(log.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_user_fails_without_panicking() {
        let store = InMemoryDocumentStore::new();
        let executor = StoreEffectExecutor::new(Arc::new(store));
        let log = SideEffectLog::new();

        log.enqueue(hosted("ghost")).await;
        log.apply_pending(&executor).await;

        let records = log.records().await;
        assert!(matches!(records[0].status, EffectStatus::Failed { attempts: 1, .. }));
    }
}
