//! Demo data seeding for development sessions.
//!
//! Populates an empty database with a fixed set of tags and notes so the
//! application has something to show. Seeding is skipped entirely as soon
//! as the database contains any note or tag.

use chrono::{Duration, Utc};
use log::info;

use crate::{Note, NoteDraft, Result, Store};

/// The fixed tag palette: (name, color).
const TAGS: [(&str, &str); 10] = [
    ("work", "indigo"),
    ("personal", "emerald"),
    ("ideas", "amber"),
    ("health", "red"),
    ("travel", "blue"),
    ("reading", "violet"),
    ("tech", "sky"),
    ("finance", "green"),
    ("todo", "pink"),
    ("random", "purple"),
];

/// Demo notes: (title, content, indices into TAGS, days ago).
const NOTES: [(&str, &str, &[usize], i64); 10] = [
    (
        "Weekly Standup Notes",
        "Discussed progress on the frontend refactor. Backend is behind schedule.",
        &[0],
        7,
    ),
    (
        "Meditation Tips",
        "Focus on breathing. Let thoughts pass by like clouds.",
        &[1, 3],
        3,
    ),
    (
        "Book List",
        "1. Deep Work\n2. Atomic Habits\n3. The Pragmatic Programmer",
        &[5],
        5,
    ),
    (
        "Startup Ideas",
        "What if there was an app that tracks your focus using webcam AI?",
        &[2, 7],
        2,
    ),
    ("Grocery List", "Milk, Bread, Eggs, Avocados, Coffee", &[1], 1),
    (
        "Dream Vacation Plan",
        "Kyoto in April for cherry blossoms. Budget: $3,000.",
        &[1, 4],
        0,
    ),
    (
        "Fitness Log",
        "Ran 5km. Did 3 sets of pushups, sit-ups, and squats.",
        &[3],
        10,
    ),
    (
        "Reflections on 2024",
        "Lots of growth. Need to keep my balance better in 2025.",
        &[6],
        20,
    ),
    (
        "Crypto Watchlist",
        "BTC, ETH, SOL. Watching for good entry points.",
        &[8, 7],
        4,
    ),
    (
        "Random Thought",
        "Do penguins have knees? Gotta look that up.",
        &[9],
        6,
    ),
];

/// Seeds demo tags and notes into an empty store.
///
/// # Returns
///
/// `true` when data was inserted, `false` when the store already had
/// notes or tags and was left untouched.
pub fn seed(store: &mut Store) -> Result<bool> {
    if store.note_count()? > 0 || store.tag_count()? > 0 {
        info!("Database already seeded");
        return Ok(false);
    }

    let mut tag_ids = Vec::with_capacity(TAGS.len());
    for (name, color) in TAGS {
        tag_ids.push(store.create_tag(name, color)?.id);
    }

    let now = Utc::now();
    for (title, content, tag_refs, days_ago) in NOTES {
        let note_tags: Vec<i64> = tag_refs.iter().map(|&i| tag_ids[i]).collect();
        let id = store.create_note(&NoteDraft {
            title: title.to_string(),
            content: content.to_string(),
            tag_ids: note_tags.clone(),
        })?;

        // Backdate so the seeded list has a spread of update times.
        let when = now - Duration::days(days_ago);
        store.update_note(&Note {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: when,
            updated_at: when,
            tag_ids: note_tags,
        })?;
    }

    info!(
        "Database seeded with {} tags and {} notes",
        TAGS.len(),
        NOTES.len()
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_fills_an_empty_store_once() {
        let mut store = Store::open_in_memory().unwrap();

        assert!(seed(&mut store).unwrap());
        assert_eq!(store.note_count().unwrap(), 10);
        assert_eq!(store.tag_count().unwrap(), 10);

        // A second run must not duplicate anything.
        assert!(!seed(&mut store).unwrap());
        assert_eq!(store.note_count().unwrap(), 10);
        assert_eq!(store.tag_count().unwrap(), 10);
    }

    #[test]
    fn seeded_notes_carry_resolved_tags() {
        let mut store = Store::open_in_memory().unwrap();
        seed(&mut store).unwrap();

        let notes = store.list_notes("standup", &[]).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].tags.len(), 1);
        assert_eq!(notes[0].tags[0].name, "work");

        // Newest seeded note comes first in the unfiltered list.
        let all = store.list_notes("", &[]).unwrap();
        assert_eq!(all[0].title, "Dream Vacation Plan");
        assert_eq!(all.last().unwrap().title, "Reflections on 2024");
    }

    #[test]
    fn seed_skips_a_store_with_existing_tags() {
        let mut store = Store::open_in_memory().unwrap();
        store.create_tag("pre-existing", "gray").unwrap();

        assert!(!seed(&mut store).unwrap());
        assert_eq!(store.note_count().unwrap(), 0);
        assert_eq!(store.tag_count().unwrap(), 1);
    }
}
