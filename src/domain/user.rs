// Copyright (c) 2025 - Cowboy AI, Inc.
//! Users, identities and notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::comment::ANONYMOUS;

/// Authenticated caller, trusted as given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User id
    pub user_id: String,
    /// Email address
    pub email: Option<String>,
    /// Display name
    pub display_name: Option<String>,
    /// Avatar URL
    pub avatar_url: Option<String>,
    /// Wants new-event notifications
    pub notifications_enabled: bool,
    /// May moderate content
    pub is_admin: bool,
}

impl Identity {
    /// Identity with only a user id
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            display_name: None,
            avatar_url: None,
            notifications_enabled: false,
            is_admin: false,
        }
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the avatar URL
    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Grant administrator rights
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    /// Display name, or `"Anonymous"` when missing or blank
    pub fn name_or_anonymous(&self) -> String {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(ANONYMOUS)
            .to_string()
    }
}

/// Stored user profile with activity statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Wants new-event notifications
    #[serde(default)]
    pub notifications_enabled: bool,
    /// Events created
    #[serde(default)]
    pub events_hosted: u64,
    /// Events joined
    #[serde(default)]
    pub events_attended: u64,
    /// When the user last created an event
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_microseconds_option"
    )]
    pub last_event_created: Option<DateTime<Utc>>,
    /// When the user last joined an event
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_microseconds_option"
    )]
    pub last_event_attended: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Fresh profile with zeroed statistics
    pub fn new(id: impl Into<String>, name: impl Into<String>, notifications_enabled: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            notifications_enabled,
            events_hosted: 0,
            events_attended: 0,
            last_event_created: None,
            last_event_attended: None,
        }
    }
}

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// An event was created
    #[serde(rename = "new_event")]
    NewEvent,
}

/// Per-user notification record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Store-assigned id (empty before the record is written)
    #[serde(default)]
    pub id: String,
    /// Notification kind
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Recipient
    pub user_id: String,
    /// Event the notification is about
    pub event_id: String,
    /// Event title at creation
    pub event_title: String,
    /// Event location at creation
    pub event_location: String,
    /// Event date at creation
    pub event_date: String,
    /// Rendered message
    pub message: String,
    /// Seen by the recipient
    #[serde(default)]
    pub read: bool,
    /// Stamped by the store
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_microseconds_option"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// New-event notification for one recipient
    pub fn new_event(
        user_id: impl Into<String>,
        event_id: impl Into<String>,
        title: &str,
        location: &str,
        date: &str,
    ) -> Self {
        Self {
            id: String::new(),
            kind: NotificationKind::NewEvent,
            user_id: user_id.into(),
            event_id: event_id.into(),
            event_title: title.to_string(),
            event_location: location.to_string(),
            event_date: date.to_string(),
            message: format!("New event: {} at {}", title, location),
            read: false,
            created_at: None,
        }
    }
}
