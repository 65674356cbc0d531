//! Session manager: signed tokens backed by an allow-list of session rows.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use scribe_core::{Error, Result, SessionRepository};
use scribe_crypto::{CryptoError, SigningKey, TokenClaims};

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Identity a valid token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

pub struct SessionManager {
    key: SigningKey,
    sessions: Arc<dyn SessionRepository>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(key: SigningKey, sessions: Arc<dyn SessionRepository>, ttl: Duration) -> Self {
        Self { key, sessions, ttl }
    }

    /// Build from the configured secret; a short secret is a config error.
    pub fn from_secret(
        secret: &str,
        sessions: Arc<dyn SessionRepository>,
        ttl: Duration,
    ) -> Result<Self> {
        let key = SigningKey::new(secret.as_bytes().to_vec())
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self::new(key, sessions, ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a session row and sign a token bound to it.
    pub async fn issue(&self, user_id: Uuid) -> Result<IssuedSession> {
        let session = self.sessions.create(user_id).await?;
        let claims = TokenClaims::issued_at(user_id, session.id, session.created_at, self.ttl);
        let token = self
            .key
            .sign(&claims)
            .map_err(|e| Error::Crypto(e.to_string()))?;

        info!(
            subsystem = "api",
            component = "session",
            op = "issue",
            user_id = %user_id,
            session_id = %session.id,
            "Session issued"
        );

        Ok(IssuedSession {
            token,
            session_id: session.id,
            expires_at: session.created_at + self.ttl,
        })
    }

    /// Resolve a token to its identity.
    ///
    /// Bad signature, expiry, and a missing session row all yield
    /// `Error::Unauthenticated`.
    pub async fn resolve(&self, token: &str) -> Result<SessionIdentity> {
        let claims = match self.key.verify(token) {
            Ok(claims) => claims,
            Err(CryptoError::Expired) => {
                debug!(subsystem = "api", component = "session", "Expired token");
                return Err(unauthenticated());
            }
            Err(e) => {
                warn!(
                    subsystem = "api",
                    component = "session",
                    error = %e,
                    "Rejected session token"
                );
                return Err(unauthenticated());
            }
        };

        if !self.sessions.exists(claims.sid, claims.sub).await? {
            debug!(
                subsystem = "api",
                component = "session",
                user_id = %claims.sub,
                session_id = %claims.sid,
                "Token refers to a revoked session"
            );
            return Err(unauthenticated());
        }

        Ok(SessionIdentity {
            user_id: claims.sub,
            session_id: claims.sid,
        })
    }

    /// Delete every session of the user.
    pub async fn revoke(&self, user_id: Uuid) -> Result<u64> {
        let removed = self.sessions.delete_for_user(user_id).await?;
        info!(
            subsystem = "api",
            component = "session",
            op = "revoke",
            user_id = %user_id,
            result_count = removed,
            "Sessions revoked"
        );
        Ok(removed)
    }
}

fn unauthenticated() -> Error {
    Error::Unauthenticated(crate::error::UNAUTHORIZED_MESSAGE.to_string())
}
