//! Error types for the emotive core library.
//!
//! The engine itself never fails: numeric input is clamped. Errors only
//! surface at the edges (config parsing, snapshot codecs, the SQLite store).

use thiserror::Error;

/// Top-level error type for all emotive operations.
#[derive(Error, Debug)]
pub enum EmotiveError {
    /// Configuration could not be parsed or read.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine state could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Entity not known to the caller.
    #[error("Entity not found: {0}")]
    EntityNotFound(crate::EntityId),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, EmotiveError>;
