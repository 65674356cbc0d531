//! User handlers: register, lookup, login, logout.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde_json::json;
use tower_cookies::Cookies;

use scribe_core::validation::{EmailLookupForm, LoginForm};
use scribe_core::UserProfile;

use super::form::FormParts;
use crate::auth::RequireUser;
use crate::envelope::ApiResponse;
use crate::error::ApiError;
use crate::AppState;

/// `POST /users/` (multipart: name, email, password, profile_picture).
pub async fn register(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let form = FormParts::read(multipart?).await?.into_register_form();
    let profile = state.accounts.register(form).await?;
    Ok(ApiResponse::created("User has been created.", profile))
}

/// `GET /users/?email=`
pub async fn lookup(
    State(state): State<AppState>,
    _auth: RequireUser,
    query: Result<Query<EmailLookupForm>, QueryRejection>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let Query(form) = query?;
    let profile = state.accounts.lookup(form).await?;
    Ok(ApiResponse::ok("User found with this email.", profile))
}

/// `POST /users/login/` (JSON: email, password). Sets the `token` cookie.
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Result<Json<LoginForm>, JsonRejection>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let Json(form) = body?;
    let (profile, session) = state.accounts.login(form).await?;
    cookies.add(state.cookies.session_cookie(session.token));
    Ok(ApiResponse::ok("User has been logged in.", profile))
}

/// `POST /users/logout/`. Revokes every session and clears the cookie.
pub async fn logout(
    State(state): State<AppState>,
    auth: RequireUser,
    cookies: Cookies,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    state.accounts.logout(auth.user_id).await?;
    cookies.remove(state.cookies.removal_cookie());
    Ok(ApiResponse::ok(
        "User has been logged out.",
        json!({ "user_id": auth.user_id }),
    ))
}
