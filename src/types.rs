//! Auxiliary types for the sift storage layer.
//!
//! This module contains the Result alias, the creation payloads for notes
//! and pins, and the theme preference enum.

use serde::{Deserialize, Serialize};

use crate::SiftError;

/// A specialized Result type for sift operations.
pub type Result<T> = std::result::Result<T, SiftError>;

/// Fields supplied by the application layer when creating a note.
///
/// The store assigns the identifier and both timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    /// Note title
    pub title: String,
    /// Note content in Markdown format
    pub content: String,
    /// Identifiers of the tags attached to the note
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// Fields supplied by the application layer when creating a pin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinDraft {
    /// Identifiers of the tags the saved search filters on
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    /// The saved search text
    pub search_query: String,
    /// Cached count of matching notes; allowed to go stale
    #[serde(default)]
    pub note_count: i64,
}

/// User theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// Parses an inbound theme value. Anything other than "light" or "dark"
    /// yields `None`, which callers treat as a reset signal.
    pub fn from_input(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}
