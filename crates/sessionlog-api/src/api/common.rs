// Common DTOs for public API
//
// These types are shared across multiple API endpoints.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sessionlog_core::DomainError;
use utoipa::ToSchema;

/// Error half of every JSON handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Standard error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message describing what went wrong.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Convert to axum response tuple
    pub fn into_response(self, status: StatusCode) -> ApiError {
        (status, Json(self))
    }
}

/// Response wrapper for list endpoints.
/// All list endpoints return responses wrapped in a `data` field.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    /// Array of items returned by the list operation.
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

pub fn not_found(what: &str) -> ApiError {
    ErrorResponse::new(format!("{what} not found")).into_response(StatusCode::NOT_FOUND)
}

/// Map a service error to a response.
///
/// Domain rule violations become 400 with their message; everything else is
/// logged and reported as a generic 500.
pub fn service_error(action: &str, e: anyhow::Error) -> ApiError {
    if let Some(domain) = e.downcast_ref::<DomainError>() {
        tracing::debug!(error = %domain, "Rejected request: {}", action);
        return ErrorResponse::new(domain.to_string()).into_response(StatusCode::BAD_REQUEST);
    }
    tracing::error!("Failed to {}: {:#}", action, e);
    ErrorResponse::new("Internal server error").into_response(StatusCode::INTERNAL_SERVER_ERROR)
}
