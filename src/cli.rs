//! CLI module for the sift storage layer.
//!
//! The binary speaks the port protocol over stdio: one JSON command per
//! stdin line, one JSON reply per stdout line. This module parses the
//! command-line arguments and runs that loop.

use std::path::PathBuf;

use clap::Parser;
use log::{error, info, warn};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::mpsc,
};

use crate::{
    seed, Bridge, Config, PortMessage, PrefStore, Reply, Result, SiftError, Store, Theme,
};

/// Main CLI application arguments
#[derive(Parser)]
#[clap(
    version = "0.1.0",
    about = "Storage and interop layer for the Sift note-taking app"
)]
pub struct Cli {
    /// Path to the record database (defaults to the platform data directory)
    #[clap(long, value_parser)]
    pub db: Option<PathBuf>,

    /// Path to the preference file
    #[clap(long, value_parser)]
    pub prefs: Option<PathBuf>,

    /// Seed an empty database with demo notes and tags
    #[clap(long)]
    pub seed: bool,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolves the final configuration: defaults, overridden by flags.
    pub fn into_config(self) -> Result<Config> {
        let mut config = Config::with_default_paths()?;
        if let Some(db) = self.db {
            config.db_path = db;
        }
        if let Some(prefs) = self.prefs {
            config.prefs_path = prefs;
        }
        config.seed_demo_data = self.seed;
        Ok(config)
    }
}

/// Application handler - wires stdin/stdout to the bridge dispatcher.
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Opens storage, runs the startup tag sweep (and optional seeding),
    /// then serves port commands until stdin closes.
    pub async fn run(self) -> Result<()> {
        let mut store = Store::open(&self.config.db_path)?;

        // Unreferenced tags are collected once per startup, never again.
        let swept = store.sweep_tags()?;
        if swept > 0 {
            info!("Removed {} unreferenced tags at startup", swept);
        }

        if self.config.seed_demo_data && seed(&mut store)? {
            info!("Seeded demo data into {}", self.config.db_path.display());
        }

        let prefs = PrefStore::open(&self.config.prefs_path, system_theme_hint())?;
        info!("Effective theme: {:?}", prefs.effective_theme());

        let (inbound_tx, inbound_rx) = mpsc::channel::<PortMessage>(64);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Reply>(64);

        let bridge = Bridge::new(store, prefs, outbound_tx);
        let dispatcher = tokio::spawn(bridge.run(inbound_rx));

        // Replies go out as JSON lines on stdout.
        let writer = tokio::spawn(async move {
            let mut stdout = io::stdout();
            while let Some(reply) = outbound_rx.recv().await {
                match serde_json::to_string(&reply) {
                    Ok(mut line) => {
                        line.push('\n');
                        if let Err(e) = stdout.write_all(line.as_bytes()).await {
                            error!("Failed to write reply: {}", e);
                            break;
                        }
                        let _ = stdout.flush().await;
                    }
                    Err(e) => error!("Failed to encode reply: {}", e),
                }
            }
        });

        // Commands come in as JSON lines on stdin.
        let mut lines = BufReader::new(io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<PortMessage>(line) {
                Ok(msg) => {
                    if inbound_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Ignoring malformed command line: {}", e),
            }
        }

        // Closing the inbound channel lets the dispatcher drain and stop.
        drop(inbound_tx);
        dispatcher
            .await
            .map_err(|e| SiftError::ApplicationError {
                message: format!("dispatcher task failed: {}", e),
            })?;
        let _ = writer.await;

        Ok(())
    }
}

/// Stand-in for the operating-system dark/light signal: an environment
/// override read once at startup.
fn system_theme_hint() -> Option<Theme> {
    std::env::var("SIFT_SYSTEM_THEME")
        .ok()
        .as_deref()
        .and_then(Theme::from_input)
}
