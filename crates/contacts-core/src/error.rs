//! Error types for contact reconciliation
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for contact reconciliation
#[derive(Error, Debug)]
pub enum Error {
    /// An input line did not yield a usable identifier
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors (from gateway clients)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The remote session is unusable for the rest of the batch
    #[error("Session error: {0}")]
    Session(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Identifier not present in the directory
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Client-specific error
    #[error("Client error ({client}): {message}")]
    Client {
        /// Client name
        client: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a client-specific error
    pub fn client(client: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Client {
            client: client.into(),
            message: message.into(),
        }
    }

    /// Whether this error invalidates the whole session
    ///
    /// Fatal errors abort a batch. Everything else is scoped to the entry
    /// that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::Session(_))
    }
}
