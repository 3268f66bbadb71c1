//! Error types for the sift storage layer.
//!
//! This module defines custom error types that categorize different failures
//! that can occur while persisting records or dispatching port commands.

use std::io;

use thiserror::Error;

/// The main error type for the sift storage layer.
#[derive(Error, Debug)]
pub enum SiftError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors surfaced by the embedded database engine.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A command payload did not have the expected shape.
    #[error("Invalid payload: {message}")]
    InvalidPayload { message: String },

    /// The outbound reply channel is no longer receivable.
    #[error("Reply channel closed: {message}")]
    PortClosed { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },
}
