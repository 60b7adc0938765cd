// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Domain Invariants
//!
//! Field-level rules shared by event creation, event updates and comment
//! creation. Every function is pure and returns the normalised value on
//! success, or a [`CercoError::Validation`] naming the offending field.
//!
//! # Rules
//!
//! - Text fields are trimmed and must not be empty
//! - `date` is `YYYY-MM-DD`, `time` is `HH:MM` or `HH:MM:SS`
//! - `coordinate` is present with latitude in [-90, 90] and longitude in
//!   [-180, 180]
//! - `category` is one of the known categories; missing means `Other`
//! - `maxAttendees`, when given, is positive
//! - comments are at most 500 characters after trimming

use chrono::NaiveDate;

use super::comment::MAX_COMMENT_CHARS;
use super::event::{parse_time, Category, Coordinate};
use crate::errors::{CercoError, CercoResult};

/// Trimmed, non-empty text
pub fn required_text(field: &str, value: &str) -> CercoResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CercoError::validation(field, "is required"));
    }
    Ok(trimmed.to_string())
}

/// Calendar date in `YYYY-MM-DD` form
pub fn validate_date(value: &str) -> CercoResult<NaiveDate> {
    let value = required_text("date", value)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|_| CercoError::validation("date", "must be a YYYY-MM-DD date"))
}

/// Time of day in `HH:MM` or `HH:MM:SS` form, returned trimmed
pub fn validate_time(value: &str) -> CercoResult<String> {
    let value = required_text("time", value)?;
    match parse_time(&value) {
        Some(_) => Ok(value),
        None => Err(CercoError::validation("time", "must be an HH:MM time")),
    }
}

/// Present and in range
pub fn validate_coordinate(coordinate: Option<Coordinate>) -> CercoResult<Coordinate> {
    let coordinate = coordinate.ok_or_else(|| CercoError::validation("coordinate", "is required"))?;

    if !coordinate.latitude.is_finite() || !(-90.0..=90.0).contains(&coordinate.latitude) {
        return Err(CercoError::validation(
            "coordinate",
            "latitude must be between -90 and 90",
        ));
    }
    if !coordinate.longitude.is_finite() || !(-180.0..=180.0).contains(&coordinate.longitude) {
        return Err(CercoError::validation(
            "coordinate",
            "longitude must be between -180 and 180",
        ));
    }
    Ok(coordinate)
}

/// Known category; `None` or blank means [`Category::Other`]
pub fn validate_category(value: Option<&str>) -> CercoResult<Category> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(Category::Other),
        Some(name) => name
            .parse()
            .map_err(|_| CercoError::validation("category", format!("{} is not a known category", name))),
    }
}

/// Capacity must be positive when given
pub fn validate_max_attendees(value: Option<u64>) -> CercoResult<Option<u64>> {
    match value {
        Some(0) => Err(CercoError::validation("maxAttendees", "must be positive")),
        other => Ok(other),
    }
}

/// Trimmed comment text within the length limit
pub fn validate_comment_text(text: &str) -> CercoResult<String> {
    let text = required_text("comment", text)?;
    if text.chars().count() > MAX_COMMENT_CHARS {
        return Err(CercoError::validation(
            "comment",
            format!("must be at most {} characters", MAX_COMMENT_CHARS),
        ));
    }
    Ok(text)
}
