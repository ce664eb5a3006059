// SPDX-License-Identifier: MIT

//! Error taxonomy for the fetch/reconcile/enrich pipeline.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors produced by the vendor client and the refresh coordinator.
#[derive(Debug, thiserror::Error)]
pub enum ScaleError {
    /// Token acquisition/refresh failed, or a 401 survived one retry.
    /// Must surface to the operator for re-authentication, never retried
    /// indefinitely.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Timeout or connection failure that exhausted its bounded retries.
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered, but with a bad status, bad JSON, or
    /// `success=false`.
    #[error("API error: {0}")]
    Api(String),

    /// Zero records across all history pages.
    #[error("No records fetched from API")]
    EmptyResult,

    /// Systemic cycle failure with no cached snapshot to fall back on.
    #[error("Update failed: {0}")]
    UpdateFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ScaleError {
    /// Whether this error should trigger the re-auth flow instead of the
    /// cached-snapshot fallback.
    pub fn is_auth(&self) -> bool {
        matches!(self, ScaleError::Auth(_))
    }
}

/// Heuristic classification of `success=false` envelope messages.
///
/// The vendor envelope carries no stable error code; messages containing
/// "token" or "unknown error" have been observed for expired/invalid
/// tokens. A structured code should be preferred if the API ever grows one;
/// until then this substring match is the documented fallback (HTTP 401
/// remains the primary signal).
pub fn is_auth_message(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    lower.contains("token") || lower.contains("unknown error")
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ScaleError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            ScaleError::Auth(msg) => (StatusCode::BAD_GATEWAY, "auth_error", Some(msg.clone())),
            ScaleError::Network(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                "network_error",
                Some(msg.clone()),
            ),
            ScaleError::Api(msg) => (StatusCode::BAD_GATEWAY, "api_error", Some(msg.clone())),
            ScaleError::EmptyResult => (StatusCode::SERVICE_UNAVAILABLE, "empty_result", None),
            ScaleError::UpdateFailed(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "update_failed",
                Some(msg.clone()),
            ),
            ScaleError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            ScaleError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, ScaleError>;
