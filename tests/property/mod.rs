// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Properties of the social-state updates that must hold for every
//! sequence of joins, leaves and likes.

mod social_state;
