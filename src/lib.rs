// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cerco Events
//!
//! Core of a campus events app: hosts publish events, students RSVP, like
//! and comment, and every client sees changes pushed in near real time.
//!
//! # Layers
//!
//! ```text
//! ┌──────────────┐   AtomicUpdate   ┌───────────────┐  change feed  ┌──────────┐
//! │   service    │ ───────────────▶ │ DocumentStore │ ────────────▶ │ triggers │
//! │ (aggregates) │                  │ memory / NATS │               └──────────┘
//! └──────────────┘                  └───────┬───────┘
//!                                           │ snapshots
//!                                           ▼
//!                                   ┌───────────────┐
//!                                   │  projection   │
//!                                   │ (read model)  │
//!                                   └───────────────┘
//! ```
//!
//! - [`aggregate`]: pure command handlers producing store instructions
//! - [`service`]: event and comment services mapping store outcomes to
//!   [`CercoError`]
//! - [`store`]: document store trait, in-memory and NATS KV backends
//! - [`triggers`]: notification fan-out, user statistics, scheduled expiry
//! - [`projection`]: per-client read model
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cerco_events::aggregate::commands::EventDraft;
//! use cerco_events::domain::{Coordinate, Identity};
//! use cerco_events::service::{EventAggregateService, EventService};
//! use cerco_events::store::InMemoryDocumentStore;
//!
//! # async fn example() -> cerco_events::CercoResult<()> {
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let events = EventAggregateService::new(store);
//!
//! let host = Identity::new("host-1").with_display_name("Ana");
//! let draft = EventDraft::new("Chess night", "Casual games", "Library")
//!     .at(Coordinate::new(42.45, -76.48))
//!     .on("2026-02-01", "19:00");
//!
//! let id = events.create_event(&host, draft).await?;
//! events.join_event(&id, &Identity::new("student-7")).await?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod jetstream;
pub mod nats;
pub mod projection;
pub mod service;
pub mod store;
pub mod subjects;
pub mod telemetry;
pub mod triggers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CercoConfig, ConfigError};
pub use errors::{CercoError, CercoResult, EntityKind, StoreError, StoreResult};
pub use nats::{NatsClient, NatsConfig};
pub use projection::{AgeTicker, ReadModel, ReadModelState};
pub use store::{DocumentStore, InMemoryDocumentStore, NatsDocumentStore};
pub use triggers::{ExpiryJob, TriggerRunner};
