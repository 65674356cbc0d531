//! HTTP-facing error type.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use scribe_core::{Error, ErrorKind, ValidationErrors};

use crate::envelope::failure;

pub const VALIDATION_MESSAGE: &str = "Failed in type validation.";
pub const INTERNAL_MESSAGE: &str = "Internal server error.";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
pub const TOO_LARGE_MESSAGE: &str = "Request body too large.";

/// Error returned by handlers and extractors; always rendered as an envelope.
#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(String),
    Forbidden(String),
    NotFound(String),
    Validation(ValidationErrors),
    Conflict(String),
    TooManyRequests,
    PayloadTooLarge,
    /// Real cause, logged but never sent to the client.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => ErrorKind::Unauthenticated.as_str(),
            ApiError::Forbidden(_) => ErrorKind::Forbidden.as_str(),
            ApiError::NotFound(_) => ErrorKind::NotFound.as_str(),
            ApiError::Validation(_) => ErrorKind::ValidationFailed.as_str(),
            ApiError::Conflict(_) => ErrorKind::Conflict.as_str(),
            ApiError::TooManyRequests => "rate_limited",
            ApiError::PayloadTooLarge => ErrorKind::ValidationFailed.as_str(),
            ApiError::Internal(_) => ErrorKind::Internal.as_str(),
        }
    }

    /// Single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(field, message);
        ApiError::Validation(errors)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Unauthenticated(msg) => ApiError::Unauthenticated(msg),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Validation(errors) => ApiError::Validation(errors),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid("body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid("query", rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::invalid("body", rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::invalid("body", err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        match self {
            ApiError::Validation(errors) => failure(
                status,
                VALIDATION_MESSAGE,
                json!({ "kind": kind, "fields": errors }),
            ),
            ApiError::Internal(cause) => {
                tracing::error!(
                    subsystem = "api",
                    error = %cause,
                    "Request failed with internal error"
                );
                failure(status, INTERNAL_MESSAGE, json!({ "kind": kind }))
            }
            ApiError::TooManyRequests => {
                failure(status, "Too many requests.", json!({ "kind": kind }))
            }
            ApiError::PayloadTooLarge => {
                failure(status, TOO_LARGE_MESSAGE, json!({ "kind": kind }))
            }
            ApiError::Unauthenticated(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => failure(status, msg, json!({ "kind": kind })),
        }
    }
}
