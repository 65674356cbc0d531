//! Password hashing using Argon2id.
//!
//! Hashes are stored in PHC string format, so parameters and salt travel with
//! the hash and verification needs nothing else.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;

use crate::error::{CryptoError, CryptoResult};

/// Hash of a throwaway password, verified against when the account does not
/// exist so that both login failure paths cost one Argon2 evaluation.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("scribe-dummy-password").ok());

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> CryptoResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| CryptoError::Hashing(e.to_string()))
}

/// Check a password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only an unparseable stored hash is an error.
pub fn verify_password(password: &str, stored_hash: &str) -> CryptoResult<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| CryptoError::MalformedHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Burn one verification's worth of work. Always returns false.
pub fn dummy_verify(password: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let hash = hash_password("plaintext-password").unwrap();
        assert!(!hash.contains("plaintext-password"));
    }

    #[test]
    fn test_malformed_hash() {
        let err = verify_password("x", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, CryptoError::MalformedHash(_)));
    }

    #[test]
    fn test_dummy_verify_is_false() {
        assert!(!dummy_verify("scribe-dummy-password"));
        assert!(!dummy_verify("anything"));
    }
}
