//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Stored hash is not a valid PHC string.
    #[error("Malformed password hash: {0}")]
    MalformedHash(String),

    /// Signing secret shorter than the required minimum.
    #[error("Signing key too short (minimum {0} bytes required)")]
    KeyTooShort(usize),

    /// Token is structurally invalid or its signature does not match.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token signature is valid but the expiry has passed.
    #[error("Token expired")]
    Expired,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_too_short_display() {
        let err = CryptoError::KeyTooShort(32);
        assert!(err.to_string().contains("32"));
    }

    #[test]
    fn test_expired_display() {
        assert_eq!(CryptoError::Expired.to_string(), "Token expired");
    }

    #[test]
    fn test_json_error_from() {
        let json_err = serde_json::from_str::<u8>("{").unwrap_err();
        let err: CryptoError = json_err.into();
        assert!(matches!(err, CryptoError::Json(_)));
    }
}
