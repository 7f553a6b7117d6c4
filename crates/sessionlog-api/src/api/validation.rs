// Input validation for session, event and realtime APIs
//
// Last-resort size limits. Emptiness rules live with the domain types in
// sessionlog-core; these only bound what the server is willing to store
// or track.

use super::common::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

// =============================================================================
// Input Size Limits
// =============================================================================

/// Maximum size for a session's user_id.
pub const MAX_USER_ID_BYTES: usize = 256;

/// Maximum size for a session summary.
pub const MAX_SUMMARY_BYTES: usize = 64 * 1024; // 64 KB

/// Maximum size for an event type tag.
pub const MAX_EVENT_TYPE_BYTES: usize = 256;

/// Maximum size for a realtime client id.
pub const MAX_CLIENT_ID_BYTES: usize = 128;

/// Generic validation error message returned to clients.
/// Intentionally vague to avoid leaking which field exceeded limits.
pub const VALIDATION_ERROR_MESSAGE: &str = "Input exceeds allowed limits";

// =============================================================================
// Validation Functions
// =============================================================================

/// Validation error - returns generic message to avoid leaking details
#[derive(Debug, PartialEq, Eq)]
pub struct ValidationError;

impl From<ValidationError> for (StatusCode, Json<ErrorResponse>) {
    fn from(_: ValidationError) -> Self {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(VALIDATION_ERROR_MESSAGE)),
        )
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        <(StatusCode, Json<ErrorResponse>)>::from(self).into_response()
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.len() > max {
        tracing::warn!(
            "{} exceeds limit: {} bytes (max: {})",
            field,
            value.len(),
            max
        );
        return Err(ValidationError);
    }
    Ok(())
}

pub fn validate_user_id(user_id: &str) -> Result<(), ValidationError> {
    check_len("user_id", user_id, MAX_USER_ID_BYTES)
}

pub fn validate_summary(summary: Option<&str>) -> Result<(), ValidationError> {
    match summary {
        Some(summary) => check_len("summary", summary, MAX_SUMMARY_BYTES),
        None => Ok(()),
    }
}

pub fn validate_event_type(event_type: &str) -> Result<(), ValidationError> {
    check_len("event_type", event_type, MAX_EVENT_TYPE_BYTES)
}

/// Client ids come from the URL path and end up in logs and presence
/// notices, so they must be non-empty printable text.
pub fn validate_client_id(client_id: &str) -> Result<(), ValidationError> {
    if client_id.trim().is_empty() || client_id.chars().any(char::is_control) {
        tracing::warn!("Rejected malformed client id");
        return Err(ValidationError);
    }
    check_len("client_id", client_id, MAX_CLIENT_ID_BYTES)
}
