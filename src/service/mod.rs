// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for Campus Events
//!
//! Application services that execute the pure aggregate handlers against a
//! [`DocumentStore`](crate::store::DocumentStore).
//!
//! # Architecture
//!
//! ```text
//! Caller (with explicit Identity)
//!     ↓
//! Service Layer (this module)
//!     ↓
//! Command Handler → AtomicUpdate / new document
//!     ↓
//! Document Store (in-memory or NATS KV)
//!     ↓
//! Change feed → Triggers      Snapshots → Read models
//! ```
//!
//! # Design Principles
//!
//! 1. **Explicit identity**: the acting user is a parameter, never ambient
//! 2. **One write per operation**: the atomicity boundary is one document
//! 3. **No hidden retries**: transient failures are returned to the caller
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cerco_events::aggregate::EventDraft;
//! use cerco_events::domain::{Coordinate, Identity};
//! use cerco_events::service::{EventAggregateService, EventService};
//! use cerco_events::store::InMemoryDocumentStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = EventAggregateService::new(Arc::new(InMemoryDocumentStore::new()));
//! let host = Identity::new("user-1").with_display_name("Sam");
//!
//! let id = service
//!     .create_event(
//!         &host,
//!         EventDraft::new("Board games", "Bring your favourites", "Commons")
//!             .at(Coordinate::new(42.45, -76.48))
//!             .on("2026-03-01", "18:00"),
//!     )
//!     .await?;
//! service.join_event(&id, &Identity::new("user-2")).await?;
//! # Ok(())
//! # }
//! ```

pub mod comments;
pub mod events;

pub use comments::{comments_for, CommentAggregateService, CommentService};
pub use events::{EventAggregateService, EventService, LikeOutcome};
