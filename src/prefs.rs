//! Preference adapter: theme and favorites.
//!
//! These two values live outside the record store, in a small JSON file
//! that survives across sessions. Writes go through a temporary file and an
//! atomic rename so a crash never leaves a half-written preference file.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{Result, SiftError, Theme};

/// On-disk shape of the preference file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Prefs {
    /// Stored theme preference; absent means "follow the system signal"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theme: Option<Theme>,
    /// Ordered list of favorited note identifiers, stored as-is
    #[serde(default)]
    favorites: Vec<i64>,
}

/// Reads and writes user preferences independent of the record store.
pub struct PrefStore {
    path: PathBuf,
    /// Operating-system-level theme signal, captured at startup
    system_theme: Option<Theme>,
    prefs: Prefs,
}

impl PrefStore {
    /// Opens the preference file at the given path, falling back to empty
    /// preferences when the file is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>, system_theme: Option<Theme>) -> Result<Self> {
        let path = path.into();

        let prefs = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str(&raw) {
                Ok(prefs) => prefs,
                Err(e) => {
                    warn!(
                        "Discarding unreadable preference file {}: {}",
                        path.display(),
                        e
                    );
                    Prefs::default()
                }
            }
        } else {
            Prefs::default()
        };

        Ok(Self {
            path,
            system_theme,
            prefs,
        })
    }

    /// Applies a theme switch command.
    ///
    /// "light" and "dark" store that preference; any other value clears the
    /// stored preference. The effective theme is re-derived either way.
    pub fn switch_theme(&mut self, value: &str) -> Result<Theme> {
        match Theme::from_input(value) {
            Some(theme) => self.prefs.theme = Some(theme),
            None => {
                debug!("Clearing stored theme preference (got {:?})", value);
                self.prefs.theme = None;
            }
        }
        self.persist()?;
        Ok(self.effective_theme())
    }

    /// The theme to apply: stored preference, else the system-level signal,
    /// else light.
    pub fn effective_theme(&self) -> Theme {
        self.prefs.theme.or(self.system_theme).unwrap_or(Theme::Light)
    }

    /// The stored preference alone, without fallbacks.
    pub fn stored_theme(&self) -> Option<Theme> {
        self.prefs.theme
    }

    /// Replaces the favorites list. The identifiers are opaque here; nothing
    /// checks that they still reference existing notes.
    pub fn save_favorites(&mut self, ids: Vec<i64>) -> Result<()> {
        self.prefs.favorites = ids;
        self.persist()
    }

    /// The stored favorites list, in saved order.
    pub fn load_favorites(&self) -> &[i64] {
        &self.prefs.favorites
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(dir)?;

        let json = serde_json::to_string_pretty(&self.prefs)?;
        temp_file.write_all(json.as_bytes())?;
        temp_file.flush()?;
        temp_file
            .persist(&self.path)
            .map_err(|e| SiftError::Io(e.error))?;

        debug!("Preferences written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("prefs.json")
    }

    #[test]
    fn theme_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = prefs_path(&dir);

        let mut prefs = PrefStore::open(&path, None).unwrap();
        assert_eq!(prefs.effective_theme(), Theme::Light);
        assert_eq!(prefs.switch_theme("dark").unwrap(), Theme::Dark);

        let reopened = PrefStore::open(&path, None).unwrap();
        assert_eq!(reopened.stored_theme(), Some(Theme::Dark));
        assert_eq!(reopened.effective_theme(), Theme::Dark);
    }

    #[test]
    fn bogus_value_clears_preference_and_falls_back_to_system() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = PrefStore::open(prefs_path(&dir), Some(Theme::Dark)).unwrap();

        prefs.switch_theme("light").unwrap();
        assert_eq!(prefs.effective_theme(), Theme::Light);

        assert_eq!(prefs.switch_theme("bogus").unwrap(), Theme::Dark);
        assert_eq!(prefs.stored_theme(), None);
    }

    #[test]
    fn without_system_signal_the_fallback_is_light() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = PrefStore::open(prefs_path(&dir), None).unwrap();
        prefs.switch_theme("dark").unwrap();
        prefs.switch_theme("reset").unwrap();
        assert_eq!(prefs.effective_theme(), Theme::Light);
    }

    #[test]
    fn favorites_roundtrip_in_saved_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = prefs_path(&dir);

        let mut prefs = PrefStore::open(&path, None).unwrap();
        prefs.save_favorites(vec![9, 3, 7]).unwrap();

        let reopened = PrefStore::open(&path, None).unwrap();
        assert_eq!(reopened.load_favorites(), &[9, 3, 7]);
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = prefs_path(&dir);
        fs::write(&path, "not json").unwrap();

        let prefs = PrefStore::open(&path, None).unwrap();
        assert_eq!(prefs.stored_theme(), None);
        assert!(prefs.load_favorites().is_empty());
    }
}
