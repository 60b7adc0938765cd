// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cerco Trigger Service
//!
//! Watches the events change feed and runs the server-side reactions:
//! - new-event notification fan-out
//! - host and attendance statistics, with periodic replay of failures
//! - scheduled expiry of past events
//!
//! Run with: cargo run --bin cerco-triggers
//!
//! Prerequisites: a NATS server with JetStream enabled (default
//! `localhost:4222`, override with `NATS_URL`).

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use cerco_events::{
    telemetry::init_tracing, triggers::SideEffectLog, CercoConfig, DocumentStore, ExpiryJob,
    NatsDocumentStore, SystemClock, TriggerRunner,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info").map_err(|e| anyhow!("failed to initialise tracing: {}", e))?;

    let config = CercoConfig::from_env().context("invalid configuration")?;
    info!(
        servers = ?config.nats.servers,
        bucket_prefix = %config.buckets.prefix,
        retention_days = config.expiry.retention_days,
        "starting cerco trigger service"
    );

    let store: Arc<dyn DocumentStore> = Arc::new(
        NatsDocumentStore::connect(&config)
            .await
            .context("failed to open document store")?,
    );

    let runner = TriggerRunner::new(store.clone())
        .with_log(SideEffectLog::with_history(config.triggers.applied_history));
    let replay = runner.spawn_replay(config.triggers.replay_interval);
    let mut triggers = runner
        .clone()
        .spawn()
        .await
        .context("failed to subscribe to event changes")?;

    let expiry = ExpiryJob::new(
        store.clone(),
        Arc::new(SystemClock),
        config.expiry.retention_days,
    )
    .spawn(config.expiry.interval);

    info!("trigger service running; press ctrl-c to stop");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown requested");
        }
        result = &mut triggers => {
            if let Err(e) = result {
                error!(error = %e, "trigger runner task ended unexpectedly");
            }
        }
    }

    triggers.abort();
    replay.abort();
    expiry.abort();
    let failed = runner.side_effects().failed().await.len();
    if failed > 0 {
        warn!(failed, "stopping with unreplayed stat effects");
    }
    info!("cerco trigger service stopped");
    Ok(())
}
