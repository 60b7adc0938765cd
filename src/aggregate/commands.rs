// Copyright (c) 2025 - Cowboy AI, Inc.
//! Commands for the Event Aggregate
//!
//! Commands express caller intent and are validated by the handlers in
//! [`super::handlers`]. They carry raw input (strings as typed by the user);
//! nothing in here has been checked yet.
//!
//! # Time Handling
//!
//! Commands carry no timestamps. `createdAt`/`updatedAt` are always assigned
//! by the store.

use crate::domain::Coordinate;

/// Input for creating an event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventDraft {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Place name
    pub location: String,
    /// Map position
    pub coordinate: Option<Coordinate>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM` or `HH:MM:SS`
    pub time: String,
    /// Category name; `None` means `Other`
    pub category: Option<String>,
    /// Optional capacity
    pub max_attendees: Option<u64>,
}

impl EventDraft {
    /// Start a draft with the descriptive text fields
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            location: location.into(),
            ..Default::default()
        }
    }

    /// Set the map position
    pub fn at(mut self, coordinate: Coordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }

    /// Set date and time
    pub fn on(mut self, date: impl Into<String>, time: impl Into<String>) -> Self {
        self.date = date.into();
        self.time = time.into();
        self
    }

    /// Set the category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Limit attendance
    pub fn max_attendees(mut self, max: u64) -> Self {
        self.max_attendees = Some(max);
        self
    }
}

/// Partial update of an event's descriptive fields
///
/// Social-state fields (attendees, likes and their lists) cannot be patched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New place name
    pub location: Option<String>,
    /// New map position
    pub coordinate: Option<Coordinate>,
    /// New date
    pub date: Option<String>,
    /// New time
    pub time: Option<String>,
    /// New category
    pub category: Option<String>,
    /// `Some(None)` removes the capacity limit
    pub max_attendees: Option<Option<u64>>,
}

impl EventPatch {
    /// Patch that changes nothing (still refreshes `updatedAt`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Change the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Change the place name
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Change the map position
    pub fn coordinate(mut self, coordinate: Coordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }

    /// Change the date
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Change the time
    pub fn time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Change the category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set or clear the capacity
    pub fn max_attendees(mut self, max: Option<u64>) -> Self {
        self.max_attendees = Some(max);
        self
    }

    /// Whether no field is patched
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
