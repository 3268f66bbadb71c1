use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Result, SiftError};

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Path to the database holding notes, tags and pins
    pub db_path: PathBuf,

    /// Path to the preference file (theme, favorites)
    pub prefs_path: PathBuf,

    /// Whether to seed demo data into an empty database at startup
    pub seed_demo_data: bool,
}

impl Config {
    /// Builds a configuration rooted in the platform data directory.
    pub fn with_default_paths() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "sift").ok_or_else(|| SiftError::Config {
            message: "could not determine a data directory for this platform".to_string(),
        })?;
        let data_dir = dirs.data_dir().to_path_buf();

        Ok(Self {
            db_path: data_dir.join("sift.db"),
            prefs_path: data_dir.join("prefs.json"),
            seed_demo_data: false,
        })
    }
}
