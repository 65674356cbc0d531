//! Signed session tokens.
//!
//! Tokens use the JWS compact form with HS256:
//!
//! ```text
//! base64url(header) "." base64url(claims) "." base64url(HMAC-SHA256)
//! ```
//!
//! A valid signature only shows the token was issued by this server. Whether
//! the session it names is still alive is decided by the session store.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

type HmacSha256 = Hmac<Sha256>;

/// Minimum signing secret length in bytes.
pub const MIN_KEY_LENGTH: usize = 32;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User the session belongs to.
    pub sub: Uuid,
    /// Session record the token is bound to.
    pub sid: Uuid,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl TokenClaims {
    /// Claims issued now and valid for `ttl`.
    pub fn new(user_id: Uuid, session_id: Uuid, ttl: Duration) -> Self {
        Self::issued_at(user_id, session_id, Utc::now(), ttl)
    }

    pub fn issued_at(user_id: Uuid, session_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user_id,
            sid: session_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// HMAC secret used to sign and verify tokens.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    key: Vec<u8>,
}

impl SigningKey {
    /// Wrap a secret, rejecting anything shorter than [`MIN_KEY_LENGTH`].
    pub fn new(secret: impl Into<Vec<u8>>) -> CryptoResult<Self> {
        let key = secret.into();
        if key.len() < MIN_KEY_LENGTH {
            return Err(CryptoError::KeyTooShort(MIN_KEY_LENGTH));
        }
        Ok(Self { key })
    }

    /// Fresh random secret of `len` bytes (at least [`MIN_KEY_LENGTH`]).
    pub fn generate(len: usize) -> Self {
        use rand::RngCore;

        let mut key = vec![0u8; len.max(MIN_KEY_LENGTH)];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }

    /// URL-safe text form, suitable for an environment variable.
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.key)
    }

    fn mac(&self) -> CryptoResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| CryptoError::InvalidToken(e.to_string()))
    }

    /// Serialize and sign the claims.
    pub fn sign(&self, claims: &TokenClaims) -> CryptoResult<String> {
        let header = URL_SAFE_NO_PAD.encode(HEADER.as_bytes());
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let signing_input = format!("{}.{}", header, payload);

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Verify signature and expiry against the current time.
    pub fn verify(&self, token: &str) -> CryptoResult<TokenClaims> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> CryptoResult<TokenClaims> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::InvalidToken("expected three segments".into()));
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| CryptoError::InvalidToken(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| CryptoError::InvalidToken("signature mismatch".into()))?;

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|e| CryptoError::InvalidToken(e.to_string()))?;
        let header: serde_json::Value = serde_json::from_slice(&header_bytes)?;
        if header.get("alg").and_then(|a| a.as_str()) != Some("HS256") {
            return Err(CryptoError::InvalidToken("unsupported algorithm".into()));
        }

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| CryptoError::InvalidToken(e.to_string()))?;
        let claims: TokenClaims = serde_json::from_slice(&payload_bytes)?;

        if claims.is_expired_at(now) {
            return Err(CryptoError::Expired);
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SigningKey {
        SigningKey::new(b"0123456789abcdef0123456789abcdef".to_vec()).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let claims = TokenClaims::new(Uuid::new_v4(), Uuid::new_v4(), Duration::hours(1));
        let token = key().sign(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(key().verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_short_key_rejected() {
        let err = SigningKey::new(b"short".to_vec()).unwrap_err();
        assert!(matches!(err, CryptoError::KeyTooShort(32)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let claims = TokenClaims::new(Uuid::new_v4(), Uuid::new_v4(), Duration::hours(1));
        let token = key().sign(&claims).unwrap();
        let other = SigningKey::generate(32);
        assert!(matches!(
            other.verify(&token),
            Err(CryptoError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let claims = TokenClaims::new(Uuid::new_v4(), Uuid::new_v4(), Duration::hours(1));
        let token = key().sign(&claims).unwrap();
        let forged = TokenClaims {
            sub: Uuid::new_v4(),
            ..claims
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let parts: Vec<&str> = token.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(key().verify(&tampered).is_err());
    }

    #[test]
    fn test_expired_token() {
        let issued = Utc::now() - Duration::hours(2);
        let claims =
            TokenClaims::issued_at(Uuid::new_v4(), Uuid::new_v4(), issued, Duration::hours(1));
        let token = key().sign(&claims).unwrap();
        assert!(matches!(key().verify(&token), Err(CryptoError::Expired)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(key().verify("").is_err());
        assert!(key().verify("a.b").is_err());
        assert!(key().verify("a.b.c.d").is_err());
        assert!(key().verify("not!base64.x.y").is_err());
    }

    #[test]
    fn test_generated_key_roundtrips_through_text() {
        let generated = SigningKey::generate(48);
        let text = generated.to_base64();
        assert_eq!(text.len(), 64);
        assert!(SigningKey::new(text.into_bytes()).is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let dbg = format!("{:?}", key());
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("0123456789"));
    }
}
