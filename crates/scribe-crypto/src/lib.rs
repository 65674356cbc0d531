//! # scribe-crypto
//!
//! Credential primitives for scribe.
//!
//! - **Password hashing**: Argon2id, PHC string format
//! - **Session tokens**: HS256 (HMAC-SHA256) signed compact tokens
//!
//! ## Examples
//!
//! ```rust
//! use chrono::Duration;
//! use scribe_crypto::{SigningKey, TokenClaims};
//! use uuid::Uuid;
//!
//! let key = SigningKey::generate(32);
//! let claims = TokenClaims::new(Uuid::new_v4(), Uuid::new_v4(), Duration::hours(1));
//! let token = key.sign(&claims).unwrap();
//! assert_eq!(key.verify(&token).unwrap(), claims);
//! ```

pub mod error;
pub mod password;
pub mod token;

pub use error::{CryptoError, CryptoResult};
pub use password::{dummy_verify, hash_password, verify_password};
pub use token::{SigningKey, TokenClaims, MIN_KEY_LENGTH};
