//! Route table and middleware stack.

use std::any::Any;
use std::path::PathBuf;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use serde_json::json;
use tower_cookies::CookieManagerLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, MediaConfig};
use crate::envelope::failure;
use crate::error::{ApiError, INTERNAL_MESSAGE};
use crate::handlers::{health, notes, users};
use crate::middleware::{rate_limit_middleware, MakeRequestUuidV7};
use crate::AppState;

/// Transport settings for [`build_router`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub allowed_origins: Vec<String>,
    pub max_request_bytes: usize,
    /// Served read-only under `/media` when set.
    pub media_dir: Option<PathBuf>,
}

impl From<&AppConfig> for RouterConfig {
    fn from(config: &AppConfig) -> Self {
        let media_dir = match &config.media {
            MediaConfig::Filesystem { dir, .. } => Some(dir.clone()),
            MediaConfig::Http { .. } => None,
        };
        Self {
            allowed_origins: config.allowed_origins.clone(),
            max_request_bytes: config.max_request_bytes,
            media_dir,
        }
    }
}

pub fn build_router(state: AppState, config: &RouterConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(health::health_check))
        // Users
        .route("/users/", post(users::register).get(users::lookup))
        .route("/users/login/", post(users::login))
        .route("/users/logout/", post(users::logout))
        // Notes
        .route("/notes/", post(notes::create_note))
        .route("/notes/getnotes/", get(notes::list_notes))
        .route(
            "/notes/:id/",
            put(notes::update_note).delete(notes::delete_note),
        )
        .route(
            "/notes/collaborators/:id/",
            post(notes::add_collaborator).delete(notes::remove_collaborator),
        )
        .fallback(route_not_found);

    if let Some(dir) = &config.media_dir {
        app = app.nest_service("/media", ServeDir::new(dir));
    }

    app.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        rate_limit_middleware,
    ))
    .layer(CookieManagerLayer::new())
    // One body limit only, so streamed overflows reach multipart errors as 413.
    .layer(DefaultBodyLimit::disable())
    .layer(RequestBodyLimitLayer::new(config.max_request_bytes))
    .layer(axum::middleware::map_response(envelope_bare_errors))
    .layer(TraceLayer::new_for_http())
    .layer(PropagateRequestIdLayer::x_request_id())
    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
    .layer(cors_layer(&config.allowed_origins))
    .layer(CatchPanicLayer::custom(panic_response))
    .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parse_allowed_origins(origins)))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

fn parse_allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found.".to_string())
}

/// Wrap framework-generated error responses that carry no body of ours.
async fn envelope_bare_errors(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return response;
    }
    match response.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge.into_response(),
        StatusCode::METHOD_NOT_ALLOWED => failure(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed.",
            json!({ "kind": "not_found" }),
        ),
        _ => response,
    }
}

fn panic_response(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(subsystem = "api", "Handler panicked");
    failure(
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_MESSAGE,
        json!({ "kind": "internal" }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use scribe_db::memory::{MemoryMediaStore, MemoryStore};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::{RateLimitConfig, SessionConfig};
    use crate::error::TOO_LARGE_MESSAGE;

    fn router() -> Router {
        let store = MemoryStore::new();
        let state = AppState::new(
            store.database(),
            Arc::new(MemoryMediaStore::new()),
            &SessionConfig {
                secret: "router-test-secret-0123456789abcdef".into(),
                ttl_hours: 1,
                cookie_secure: false,
            },
            &RateLimitConfig {
                enabled: false,
                requests: 1,
                period_secs: 1,
            },
        )
        .unwrap();
        build_router(
            state,
            &RouterConfig {
                allowed_origins: vec!["http://localhost:3000".into()],
                max_request_bytes: 1024,
                media_dir: None,
            },
        )
    }

    #[tokio::test]
    async fn test_wrong_method_gets_envelope() {
        let resp = router()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/notes/getnotes/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let resp = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users/login/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, "4096")
                    .body(Body::from(vec![b' '; 4096]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_streamed_oversized_upload_is_413() {
        let boundary = "scribe-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n"
        )
        .into_bytes();
        body.extend(vec![b'a'; 4096]);
        body.extend(format!("\r\n--{boundary}--\r\n").into_bytes());

        let resp = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users/")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let envelope: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope["message"], TOO_LARGE_MESSAGE);
        assert_eq!(envelope["statusCode"], 413);
    }

    #[test]
    fn test_invalid_origins_are_skipped() {
        let parsed = parse_allowed_origins(&[
            "https://a.example".to_string(),
            "bad\norigin".to_string(),
        ]);
        assert_eq!(parsed, vec![HeaderValue::from_static("https://a.example")]);
    }

    #[tokio::test]
    async fn test_bare_413_gets_envelope() {
        let bare = StatusCode::PAYLOAD_TOO_LARGE.into_response();
        let wrapped = envelope_bare_errors(bare).await;
        assert_eq!(wrapped.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            wrapped.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_other_responses_untouched() {
        let ok = StatusCode::NO_CONTENT.into_response();
        assert_eq!(envelope_bare_errors(ok).await.status(), StatusCode::NO_CONTENT);
    }
}
