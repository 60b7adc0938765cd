// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cerco Domain Models
//!
//! Typed views of the documents kept in the store, plus the pure rules that
//! govern them.
//!
//! # Entities
//!
//! - [`Event`] - campus event with attendee and like membership
//! - [`Comment`] - immutable comment on an event
//! - [`UserProfile`] - user statistics maintained by triggers
//! - [`Notification`] - per-user new-event notice
//!
//! # Value Objects
//!
//! - [`Coordinate`] - latitude/longitude pair
//! - [`Category`] - event taxonomy
//! - [`Identity`] - the authenticated caller

pub mod comment;
pub mod event;
pub mod geo;
pub mod invariants;
pub mod user;

pub use comment::{relative_age, Comment, ANONYMOUS, MAX_COMMENT_CHARS};
pub use event::{Category, Coordinate, Event, UnknownCategory};
pub use geo::{distance_miles, format_distance};
pub use user::{Identity, Notification, NotificationKind, UserProfile};
