// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional Aggregates
//!
//! Event and comment aggregates expressed as pure functions from commands to
//! store instructions. The services in [`crate::service`] execute them.
//!
//! # Pattern
//!
//! ```text
//! Command → Handler → AtomicUpdate → DocumentStore
//!    ↓         ↓            ↓
//! Intent  Validation  Preconditions + field ops
//! ```
//!
//! Handlers never read the current document. Anything that depends on it
//! (membership, capacity, counter floors) is a precondition or a store-side
//! operation, evaluated atomically against the committed state.

pub mod commands;
pub mod handlers;

pub use commands::{EventDraft, EventPatch};
pub use handlers::*;

/// Wire names of document fields
pub mod fields {
    /// Event title
    pub const TITLE: &str = "title";
    /// Event description
    pub const DESCRIPTION: &str = "description";
    /// Event place name
    pub const LOCATION: &str = "location";
    /// Event position
    pub const COORDINATE: &str = "coordinate";
    /// Event day
    pub const DATE: &str = "date";
    /// Event time of day
    pub const TIME: &str = "time";
    /// Event category
    pub const CATEGORY: &str = "category";
    /// Event capacity
    pub const MAX_ATTENDEES: &str = "maxAttendees";
    /// Host id
    pub const CREATED_BY: &str = "createdBy";
    /// Host name
    pub const CREATED_BY_NAME: &str = "createdByName";
    /// Attendee counter
    pub const ATTENDEES: &str = "attendees";
    /// Attendee ids
    pub const ATTENDEES_LIST: &str = "attendeesList";
    /// Like counter
    pub const LIKES: &str = "likes";
    /// Liking user ids
    pub const LIKES_LIST: &str = "likesList";

    /// Comment's event
    pub const EVENT_ID: &str = "eventId";
    /// Comment author / notification recipient
    pub const USER_ID: &str = "userId";
    /// Comment author name
    pub const USER_NAME: &str = "userName";
    /// Comment author avatar
    pub const USER_AVATAR: &str = "userAvatar";
    /// Comment text
    pub const COMMENT: &str = "comment";

    /// User opted into notifications
    pub const NOTIFICATIONS_ENABLED: &str = "notificationsEnabled";
    /// Events hosted counter
    pub const EVENTS_HOSTED: &str = "eventsHosted";
    /// Events attended counter
    pub const EVENTS_ATTENDED: &str = "eventsAttended";
    /// Last event creation time
    pub const LAST_EVENT_CREATED: &str = "lastEventCreated";
    /// Last event join time
    pub const LAST_EVENT_ATTENDED: &str = "lastEventAttended";
}
