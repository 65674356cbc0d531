//! Error types for scribe.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Result type alias using scribe's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for scribe operations.
///
/// Every variant maps onto one client-visible category (see
/// [`Error::kind`]); the HTTP layer renders the category, never the
/// underlying detail of storage, upload or crypto failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced entity is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, invalid, expired or revoked session
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated but not entitled to the target resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate or redundant write, or a write that would change nothing
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed or out-of-range input, with one entry per violated field
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Object storage upload or removal failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Hashing or signing primitive failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client-visible error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    ValidationFailed,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Stable snake_case name used in response bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl Error {
    /// Classify this error into its client-visible category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Validation(_) => ErrorKind::ValidationFailed,
            Error::Database(_)
            | Error::Storage(_)
            | Error::Crypto(_)
            | Error::Config(_)
            | Error::Serialization(_)
            | Error::Request(_)
            | Error::Internal(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(e: ValidationErrors) -> Self {
        Error::Validation(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
