// Copyright (c) 2025 - Cowboy AI, Inc.
//! Periodic refresh of relative comment ages

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Emits a monotonically increasing tick on a fixed interval
///
/// Live views re-render `relative_age` labels on every tick. Dropping the
/// ticker stops it.
#[derive(Debug)]
pub struct AgeTicker {
    ticks: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl AgeTicker {
    /// Start ticking every `period`; the first tick arrives after one period
    pub fn start(period: Duration) -> Self {
        let (sender, ticks) = watch::channel(0u64);
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                sender.send_modify(|tick| *tick += 1);
                if sender.is_closed() {
                    break;
                }
            }
        });
        Self { ticks, task }
    }

    /// Ticks emitted so far
    pub fn ticks(&self) -> u64 {
        *self.ticks.borrow()
    }

    /// Receiver for awaiting the next tick
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.ticks.clone()
    }
}

impl Drop for AgeTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
