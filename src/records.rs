//! Core record structures for the sift storage layer.
//!
//! Notes, tags and pins as they are stored and as they travel over the port.
//! The read-side shapes (`NoteView`, `PinView`) replace tag identifier lists
//! with the resolved tag records and never expose `tagIds`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a single note in our system.
///
/// A note references its tags by identifier; it does not own them. Stale
/// references are tolerated and resolved to nothing at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier for the note
    pub id: i64,
    /// Note title
    pub title: String,
    /// Note content in Markdown format
    pub content: String,
    /// When the note was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Identifiers of the tags attached to the note
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// A named, colored label attachable to notes. Unique by (name, color).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier for the tag
    pub id: i64,
    /// Tag name
    pub name: String,
    /// Tag color, from a fixed palette
    pub color: String,
}

/// A note as returned to the application layer, with tag references
/// resolved into embedded tag records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Resolved tag records, in the order the note references them
    pub tags: Vec<Tag>,
}

/// A saved search shortcut as returned to the application layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinView {
    pub id: i64,
    /// Resolved tag records, in the order the pin references them
    pub tags: Vec<Tag>,
    /// The saved search text
    pub search_query: String,
    /// Cached count of matching notes; allowed to go stale
    pub note_count: i64,
}
