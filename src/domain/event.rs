// Copyright (c) 2025 - Cowboy AI, Inc.
//! Campus Event Entity
//!
//! The event document as stored in the `events` collection. Social-state
//! fields come in list/counter pairs that must always agree:
//!
//! - `attendees == attendeesList.len()`
//! - `likes == likesList.len()`
//!
//! Those pairs are only ever changed through atomic store updates built by
//! [`crate::aggregate::handlers`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Accepted time-of-day formats
pub const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Parse an `HH:MM` or `HH:MM:SS` time
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
}

/// Geographic position of an event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Degrees north, -90..=90
    pub latitude: f64,
    /// Degrees east, -180..=180
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate (unchecked)
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and in range
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Event category
///
/// Stored events with a name outside this set read back as [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Category {
    /// Games, pickup sports
    Sports,
    /// Lectures, study groups
    Academic,
    /// Parties, meetups
    Social,
    /// Fitness, mindfulness
    Wellness,
    /// Exhibitions, performances
    Arts,
    /// Hackathons, tech talks
    Technology,
    /// Food events
    Food,
    /// Older name for study groups
    Study,
    /// Older name for concerts and jams
    Music,
    /// Anything else
    #[default]
    Other,
}

impl Category {
    /// Categories offered when creating an event, in display order
    pub const ALL: [Category; 8] = [
        Category::Sports,
        Category::Academic,
        Category::Social,
        Category::Wellness,
        Category::Arts,
        Category::Technology,
        Category::Food,
        Category::Other,
    ];

    /// Still accepted so existing events keep their category
    pub const LEGACY: [Category; 2] = [Category::Study, Category::Music];

    /// Stored name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sports => "Sports",
            Category::Academic => "Academic",
            Category::Social => "Social",
            Category::Wellness => "Wellness",
            Category::Arts => "Arts",
            Category::Technology => "Technology",
            Category::Food => "Food",
            Category::Study => "Study",
            Category::Music => "Music",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown category name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .chain(Category::LEGACY)
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl From<String> for Category {
    fn from(name: String) -> Self {
        name.parse().unwrap_or_default()
    }
}

/// Stored campus event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Store-assigned id
    pub id: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Human readable place name
    pub location: String,
    /// Map position
    pub coordinate: Coordinate,
    /// Calendar day
    pub date: NaiveDate,
    /// `HH:MM` or `HH:MM:SS`
    pub time: String,
    /// Category
    #[serde(default)]
    pub category: Category,
    /// Optional capacity
    #[serde(default)]
    pub max_attendees: Option<u64>,
    /// Host user id
    pub created_by: String,
    /// Host display name
    #[serde(default)]
    pub created_by_name: String,
    /// Attendee count
    #[serde(default)]
    pub attendees: u64,
    /// Attending user ids
    #[serde(default)]
    pub attendees_list: Vec<String>,
    /// Like count
    #[serde(default)]
    pub likes: u64,
    /// Liking user ids
    #[serde(default)]
    pub likes_list: Vec<String>,
    /// Creation time
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub created_at: DateTime<Utc>,
    /// Last modification time
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether the user attends
    pub fn is_attending(&self, user_id: &str) -> bool {
        self.attendees_list.iter().any(|id| id == user_id)
    }

    /// Whether the user liked the event
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes_list.iter().any(|id| id == user_id)
    }

    /// Whether the capacity is reached
    pub fn is_full(&self) -> bool {
        self.max_attendees
            .map(|max| self.attendees >= max)
            .unwrap_or(false)
    }

    /// Both counters agree with their lists
    pub fn counters_consistent(&self) -> bool {
        self.attendees as usize == self.attendees_list.len()
            && self.likes as usize == self.likes_list.len()
    }

    /// Local start time, if the stored time parses
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        parse_time(&self.time).map(|time| self.date.and_time(time))
    }
}
