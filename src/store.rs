//! Embedded record store for notes, tags and pins.
//!
//! Backed by a SQLite database with an explicitly declared schema. Tag
//! membership is kept in ordered junction tables so that tag resolution
//! preserves the order of a record's tag references, and so the startup
//! sweep can count referencing notes through a declared index instead of
//! scanning note bodies.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use chrono::Utc;
use log::{debug, info};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};

use crate::{Note, NoteDraft, NoteView, PinDraft, PinView, Result, SiftError, Tag};

/// Schema for the record collections.
///
/// No foreign keys on the junction tables: dangling tag references are
/// tolerated by design and resolved to nothing at read time.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notes (
    id          INTEGER PRIMARY KEY,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notes_updated_at ON notes (updated_at);

CREATE TABLE IF NOT EXISTS tags (
    id     INTEGER PRIMARY KEY,
    name   TEXT NOT NULL,
    color  TEXT NOT NULL,
    UNIQUE (name, color)
);

CREATE TABLE IF NOT EXISTS note_tags (
    note_id   INTEGER NOT NULL,
    tag_id    INTEGER NOT NULL,
    position  INTEGER NOT NULL,
    PRIMARY KEY (note_id, tag_id)
);
CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags (tag_id);

CREATE TABLE IF NOT EXISTS pins (
    id            INTEGER PRIMARY KEY,
    search_query  TEXT NOT NULL,
    note_count    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS pin_tags (
    pin_id    INTEGER NOT NULL,
    tag_id    INTEGER NOT NULL,
    position  INTEGER NOT NULL,
    PRIMARY KEY (pin_id, tag_id)
);
";

/// Internal row shape shared by the note read paths.
struct NoteRow {
    id: i64,
    title: String,
    content: String,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

/// Manages the storage and retrieval of notes, tags and pins.
///
/// A `Store` is constructed explicitly and passed to whoever needs it; there
/// is no process-wide database handle. The underlying engine serializes
/// conflicting writes internally.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) the database at the given path and ensures the
    /// schema exists. Parent directories are created when missing.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating data directory: {}", parent.display());
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        info!("Opened record store at {}", path.display());
        Ok(store)
    }

    /// Opens an in-memory database with the full schema. Used by tests and
    /// throwaway sessions.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Closes the underlying connection, flushing any pending state.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| SiftError::Database(e))
    }

    // ----- notes ------------------------------------------------------

    /// Creates a note from the given draft, assigning the identifier and
    /// setting `created_at = updated_at = now`.
    ///
    /// # Returns
    ///
    /// The identifier of the new note.
    pub fn create_note(&mut self, draft: &NoteDraft) -> Result<i64> {
        let now = Utc::now();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO notes (title, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![draft.title, draft.content, now, now],
        )?;
        let note_id = tx.last_insert_rowid();
        replace_note_tags(&tx, note_id, &draft.tag_ids)?;
        tx.commit()?;

        info!("Created note {}", note_id);
        Ok(note_id)
    }

    /// Replaces every field of an existing note except its identifier.
    ///
    /// Timestamps are taken from the caller as-is; `updated_at` is NOT
    /// touched here. Updating a note that does not exist is a silent no-op.
    pub fn update_note(&mut self, note: &Note) -> Result<()> {
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE notes SET title = ?1, content = ?2, created_at = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                note.title,
                note.content,
                note.created_at,
                note.updated_at,
                note.id
            ],
        )?;

        if changed == 0 {
            debug!("Update for missing note {} ignored", note.id);
            return Ok(());
        }

        replace_note_tags(&tx, note.id, &note.tag_ids)?;
        tx.commit()?;

        info!("Updated note {}", note.id);
        Ok(())
    }

    /// Removes a note and its tag memberships. Tags themselves are left in
    /// place; the startup sweep collects the unreferenced ones.
    pub fn delete_note(&mut self, note_id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [note_id])?;
        tx.execute("DELETE FROM notes WHERE id = ?1", [note_id])?;
        tx.commit()?;

        info!("Deleted note {}", note_id);
        Ok(())
    }

    /// Retrieves a note by its identifier, with tag references resolved to
    /// embedded tag records (missing tags omitted).
    ///
    /// Returns `None` when no note has the given identifier.
    pub fn get_note(&self, note_id: i64) -> Result<Option<NoteView>> {
        debug!("Retrieving note by id: {}", note_id);

        let row = self
            .conn
            .query_row(
                "SELECT id, title, content, created_at, updated_at FROM notes WHERE id = ?1",
                [note_id],
                note_row,
            )
            .optional()?;

        let Some(note) = row else {
            debug!("Note not found: {}", note_id);
            return Ok(None);
        };

        let tag_ids = self.note_tag_ids(note.id)?;
        let tags = self.resolve_tags(&tag_ids)?;
        Ok(Some(into_view(note, tags)))
    }

    /// Lists notes filtered by search text and a required tag set, newest
    /// first by `updated_at`. This ordering is the canonical list order for
    /// display.
    ///
    /// A note survives iff the normalized search text is empty or appears
    /// (case-insensitively) in its title or content, AND every required tag
    /// id is in the note's tag set. The surviving notes' tags are resolved
    /// with a single batched lookup; non-surviving notes never trigger tag
    /// resolution.
    pub fn list_notes(&self, search: &str, required_tag_ids: &[i64]) -> Result<Vec<NoteView>> {
        let term = search.trim().to_lowercase();
        debug!(
            "Listing notes (search: {:?}, required tags: {:?})",
            term, required_tag_ids
        );

        let mut stmt = self.conn.prepare(
            "SELECT id, title, content, created_at, updated_at FROM notes
             ORDER BY updated_at DESC, id DESC",
        )?;
        let mut notes = Vec::new();
        for row in stmt.query_map([], note_row)? {
            notes.push(row?);
        }

        let memberships = self.note_tag_memberships()?;
        let no_tags: Vec<i64> = Vec::new();

        let kept: Vec<NoteRow> = notes
            .into_iter()
            .filter(|note| {
                let tag_ids = memberships.get(&note.id).unwrap_or(&no_tags);

                let matches_search = term.is_empty()
                    || note.title.to_lowercase().contains(&term)
                    || note.content.to_lowercase().contains(&term);

                let matches_tags = required_tag_ids.iter().all(|id| tag_ids.contains(id));

                matches_search && matches_tags
            })
            .collect();

        // Resolve the union of the survivors' tag ids once, not per note.
        let mut wanted = Vec::new();
        let mut seen = HashSet::new();
        for note in &kept {
            if let Some(tag_ids) = memberships.get(&note.id) {
                for &id in tag_ids {
                    if seen.insert(id) {
                        wanted.push(id);
                    }
                }
            }
        }
        let resolved = self.tags_by_ids(&wanted)?;

        let views = kept
            .into_iter()
            .map(|note| {
                let tags = memberships
                    .get(&note.id)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(|id| resolved.get(id).cloned())
                            .collect()
                    })
                    .unwrap_or_default();
                into_view(note, tags)
            })
            .collect();

        Ok(views)
    }

    /// Number of notes in the store.
    pub fn note_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?)
    }

    // ----- tags -------------------------------------------------------

    /// Creates a tag, or returns the existing record when a tag with the
    /// same (name, color) pair is already present.
    pub fn create_tag(&self, name: &str, color: &str) -> Result<Tag> {
        let existing = self
            .conn
            .query_row(
                "SELECT id, name, color FROM tags WHERE name = ?1 AND color = ?2",
                params![name, color],
                tag_row,
            )
            .optional()?;

        if let Some(tag) = existing {
            debug!("Tag ({}, {}) already exists as {}", name, color, tag.id);
            return Ok(tag);
        }

        self.conn.execute(
            "INSERT INTO tags (name, color) VALUES (?1, ?2)",
            params![name, color],
        )?;
        let tag = Tag {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            color: color.to_string(),
        };

        info!("Created tag {} ({}, {})", tag.id, name, color);
        Ok(tag)
    }

    /// Lists tags whose name or color contains the search text
    /// (case-insensitive). An empty search returns every tag, unordered.
    pub fn list_tags(&self, search: &str) -> Result<Vec<Tag>> {
        let term = search.trim().to_lowercase();

        let mut stmt = self.conn.prepare("SELECT id, name, color FROM tags")?;
        let mut tags = Vec::new();
        for row in stmt.query_map([], tag_row)? {
            let tag = row?;
            if term.is_empty()
                || tag.name.to_lowercase().contains(&term)
                || tag.color.to_lowercase().contains(&term)
            {
                tags.push(tag);
            }
        }

        Ok(tags)
    }

    /// Number of tags in the store.
    pub fn tag_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?)
    }

    /// Deletes every tag referenced by zero notes.
    ///
    /// Pin references do not keep a tag alive. This is a best-effort,
    /// non-transactional cleanup run once at application start; reads
    /// tolerate any dangling reference it may leave behind.
    ///
    /// # Returns
    ///
    /// The number of tags removed.
    pub fn sweep_tags(&self) -> Result<usize> {
        let mut stmt = self.conn.prepare("SELECT id FROM tags")?;
        let mut tag_ids = Vec::new();
        for row in stmt.query_map([], |row| row.get::<_, i64>(0))? {
            tag_ids.push(row?);
        }
        drop(stmt);

        let mut removed = 0;
        for tag_id in tag_ids {
            let references: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM note_tags WHERE tag_id = ?1",
                [tag_id],
                |row| row.get(0),
            )?;

            if references == 0 {
                self.conn
                    .execute("DELETE FROM tags WHERE id = ?1", [tag_id])?;
                debug!("Swept unreferenced tag {}", tag_id);
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Swept {} unreferenced tags", removed);
        }
        Ok(removed)
    }

    // ----- pins -------------------------------------------------------

    /// Creates a pin from the given draft and returns it with tag
    /// references resolved, identical pattern to notes.
    pub fn create_pin(&mut self, draft: &PinDraft) -> Result<PinView> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO pins (search_query, note_count) VALUES (?1, ?2)",
            params![draft.search_query, draft.note_count],
        )?;
        let pin_id = tx.last_insert_rowid();

        let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO pin_tags (pin_id, tag_id, position) VALUES (?1, ?2, ?3)")?;
        for (position, tag_id) in draft.tag_ids.iter().enumerate() {
            stmt.execute(params![pin_id, tag_id, position as i64])?;
        }
        drop(stmt);
        tx.commit()?;

        info!("Created pin {}", pin_id);

        // Read back through the normal path so the reply matches a later get.
        self.get_pin(pin_id)?
            .ok_or_else(|| SiftError::ApplicationError {
                message: format!("pin {} vanished immediately after insert", pin_id),
            })
    }

    /// Retrieves a pin by its identifier with resolved tags, or `None`.
    pub fn get_pin(&self, pin_id: i64) -> Result<Option<PinView>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, search_query, note_count FROM pins WHERE id = ?1",
                [pin_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, search_query, note_count)) = row else {
            debug!("Pin not found: {}", pin_id);
            return Ok(None);
        };

        let tag_ids = self.pin_tag_ids(id)?;
        let tags = self.resolve_tags(&tag_ids)?;
        Ok(Some(PinView {
            id,
            tags,
            search_query,
            note_count,
        }))
    }

    /// Lists every pin with its tag references resolved.
    pub fn list_pins(&self) -> Result<Vec<PinView>> {
        let mut stmt = self.conn.prepare("SELECT id FROM pins ORDER BY id")?;
        let mut pin_ids = Vec::new();
        for row in stmt.query_map([], |row| row.get::<_, i64>(0))? {
            pin_ids.push(row?);
        }
        drop(stmt);

        let mut pins = Vec::new();
        for pin_id in pin_ids {
            if let Some(pin) = self.get_pin(pin_id)? {
                pins.push(pin);
            }
        }
        Ok(pins)
    }

    /// Removes a pin and its tag memberships. Pins are never swept; they
    /// only go away through this call.
    pub fn delete_pin(&mut self, pin_id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM pin_tags WHERE pin_id = ?1", [pin_id])?;
        tx.execute("DELETE FROM pins WHERE id = ?1", [pin_id])?;
        tx.commit()?;

        info!("Deleted pin {}", pin_id);
        Ok(())
    }

    // ----- tag resolution helpers --------------------------------------

    /// Resolves tag identifiers to tag records, preserving the input order
    /// and dropping any identifier that resolves to nothing.
    fn resolve_tags(&self, tag_ids: &[i64]) -> Result<Vec<Tag>> {
        let by_id = self.tags_by_ids(tag_ids)?;
        Ok(tag_ids
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .collect())
    }

    /// Fetches the given tags in one query, keyed by identifier.
    fn tags_by_ids(&self, tag_ids: &[i64]) -> Result<HashMap<i64, Tag>> {
        if tag_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT id, name, color FROM tags WHERE id IN ({})",
            repeat_vars(tag_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let mut by_id = HashMap::with_capacity(tag_ids.len());
        for row in stmt.query_map(params_from_iter(tag_ids.iter()), tag_row)? {
            let tag = row?;
            by_id.insert(tag.id, tag);
        }
        Ok(by_id)
    }

    /// Tag identifiers of a single note, in reference order.
    fn note_tag_ids(&self, note_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag_id FROM note_tags WHERE note_id = ?1 ORDER BY position")?;
        let mut tag_ids = Vec::new();
        for row in stmt.query_map([note_id], |row| row.get::<_, i64>(0))? {
            tag_ids.push(row?);
        }
        Ok(tag_ids)
    }

    /// Tag identifiers of a single pin, in reference order.
    fn pin_tag_ids(&self, pin_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag_id FROM pin_tags WHERE pin_id = ?1 ORDER BY position")?;
        let mut tag_ids = Vec::new();
        for row in stmt.query_map([pin_id], |row| row.get::<_, i64>(0))? {
            tag_ids.push(row?);
        }
        Ok(tag_ids)
    }

    /// Tag membership of every note, in reference order per note.
    fn note_tag_memberships(&self) -> Result<HashMap<i64, Vec<i64>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT note_id, tag_id FROM note_tags ORDER BY note_id, position")?;

        let mut memberships: HashMap<i64, Vec<i64>> = HashMap::new();
        for row in stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })? {
            let (note_id, tag_id) = row?;
            memberships.entry(note_id).or_default().push(tag_id);
        }
        Ok(memberships)
    }
}

/// Rewrites a note's tag memberships to exactly the given list.
fn replace_note_tags(tx: &Transaction<'_>, note_id: i64, tag_ids: &[i64]) -> Result<()> {
    tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [note_id])?;

    let mut stmt =
        tx.prepare("INSERT OR IGNORE INTO note_tags (note_id, tag_id, position) VALUES (?1, ?2, ?3)")?;
    for (position, tag_id) in tag_ids.iter().enumerate() {
        stmt.execute(params![note_id, tag_id, position as i64])?;
    }
    Ok(())
}

fn note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn tag_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
    })
}

fn into_view(note: NoteRow, tags: Vec<Tag>) -> NoteView {
    NoteView {
        id: note.id,
        title: note.title,
        content: note.content,
        created_at: note.created_at,
        updated_at: note.updated_at,
        tags,
    }
}

fn repeat_vars(count: usize) -> String {
    let mut vars = "?,".repeat(count);
    vars.pop();
    vars
}
