//! Liveness endpoint.

use axum::{response::IntoResponse, Json};

/// Report that the process is up, with the running version.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
