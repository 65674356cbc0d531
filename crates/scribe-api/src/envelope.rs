//! Uniform response envelope.
//!
//! Every response body, success or failure, has the shape
//! `{success, statusCode, message, data, error, meta: {timestamp}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: String,
}

impl Meta {
    fn now() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub data: Option<T>,
    pub error: Option<Value>,
    pub meta: Meta,
}

/// A successful response carrying `data`.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    message: String,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            status_code: self.status.as_u16(),
            message: self.message,
            data: Some(self.data),
            error: None,
            meta: Meta::now(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Render a failure envelope. `error` must be a JSON object.
pub fn failure(status: StatusCode, message: impl Into<String>, error: Value) -> Response {
    let body: Envelope<Value> = Envelope {
        success: false,
        status_code: status.as_u16(),
        message: message.into(),
        data: None,
        error: Some(error),
        meta: Meta::now(),
    };
    (status, Json(body)).into_response()
}
