//! # scribe-api
//!
//! HTTP server for scribe: multipart/JSON request decoding, session cookies,
//! the account and note services, and the uniform response envelope.

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod services;
pub mod session;

use std::sync::Arc;

use scribe_core::{MediaStore, Result};
use scribe_db::Repositories;

pub use auth::{CookieSettings, RequireUser};
pub use config::AppConfig;
pub use error::ApiError;
pub use router::{build_router, RouterConfig};

use config::{RateLimitConfig, SessionConfig};
use middleware::{build_rate_limiter, GlobalRateLimiter};
use services::{AccountService, NoteService};
use session::SessionManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub notes: Arc<NoteService>,
    pub sessions: Arc<SessionManager>,
    pub cookies: CookieSettings,
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    /// Wire services over the given repositories and media store.
    pub fn new(
        repos: Repositories,
        media: Arc<dyn MediaStore>,
        session: &SessionConfig,
        rate_limit: &RateLimitConfig,
    ) -> Result<Self> {
        let ttl = chrono::Duration::hours(session.ttl_hours);
        let sessions = Arc::new(SessionManager::from_secret(
            &session.secret,
            repos.sessions.clone(),
            ttl,
        )?);
        let accounts = Arc::new(AccountService::new(
            repos.users.clone(),
            media.clone(),
            sessions.clone(),
        ));
        let notes = Arc::new(NoteService::new(repos.notes, repos.users, media));

        Ok(Self {
            accounts,
            notes,
            sessions,
            cookies: CookieSettings {
                secure: session.cookie_secure,
                max_age: ttl,
            },
            rate_limiter: build_rate_limiter(rate_limit),
        })
    }
}
