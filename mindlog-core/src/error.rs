//! Error types for mindlog-core

use thiserror::Error;

/// Main error type for the mindlog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error (tags, goals)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Rejected input (non-positive window, negative duration, unknown enum text)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation requires the admin role
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// User not found
    #[error("user not found: {0}")]
    UserNotFound(i64),

    /// Meditation not found
    #[error("meditation not found: {0}")]
    MeditationNotFound(i64),

    /// Meditation type not found
    #[error("meditation type not found: {0}")]
    MeditationTypeNotFound(i64),

    /// Session not found (or not owned by the caller)
    #[error("session not found: {0}")]
    SessionNotFound(i64),
}

/// Result type alias for mindlog-core
pub type Result<T> = std::result::Result<T, Error>;
