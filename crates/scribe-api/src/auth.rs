//! Authentication extractor and the session cookie.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use tower_cookies::cookie::time::Duration as CookieDuration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use scribe_core::defaults::SESSION_COOKIE;

use crate::error::{ApiError, UNAUTHORIZED_MESSAGE};
use crate::AppState;

/// Attributes of the `token` cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
    pub max_age: chrono::Duration,
}

impl CookieSettings {
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, token);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_secure(self.secure);
        cookie.set_max_age(CookieDuration::seconds(self.max_age.num_seconds()));
        cookie
    }

    /// Cookie that tells the browser to drop the session cookie.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::from(SESSION_COOKIE);
        cookie.set_path("/");
        cookie
    }
}

/// Extractor that requires a live session.
///
/// The token is read from the `token` cookie, falling back to an
/// `Authorization: Bearer` header.
///
/// ```ignore
/// async fn handler(auth: RequireUser) -> Result<impl IntoResponse, ApiError> {
///     let notes = state.notes.list(auth.user_id).await?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts, state)
            .await
            .ok_or_else(|| ApiError::Unauthenticated(UNAUTHORIZED_MESSAGE.to_string()))?;

        let identity = state.sessions.resolve(&token).await?;
        Ok(RequireUser {
            user_id: identity.user_id,
            session_id: identity.session_id,
        })
    }
}

async fn session_token(parts: &mut Parts, state: &AppState) -> Option<String> {
    if let Ok(cookies) = Cookies::from_request_parts(parts, state).await {
        if let Some(cookie) = cookies.get(SESSION_COOKIE) {
            if !cookie.value().is_empty() {
                return Some(cookie.value().to_string());
            }
        }
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
