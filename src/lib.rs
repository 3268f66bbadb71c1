//! Storage and interop layer for the Sift note-taking application.
//!
//! This library persists notes, tags and pins in an embedded database,
//! answers filtered queries over them, and bridges tagged port commands
//! from the application layer to storage operations.

mod bridge;
mod cli;
mod config;
mod errors;
mod prefs;
mod records;
mod seeder;
mod store;
mod types;

// Re-export key components
pub use bridge::*;
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use prefs::*;
pub use records::*;
pub use seeder::*;
pub use store::*;
pub use types::*;
