use axum::response::IntoResponse;
use serde_json::json;

use crate::envelope::ApiResponse;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    ApiResponse::ok(
        "Service is healthy.",
        json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}
