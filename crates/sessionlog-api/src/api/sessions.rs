// Session CRUD HTTP routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sessionlog_core::Session;
use sessionlog_storage::StorageBackend;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{not_found, service_error, ApiError, ErrorResponse};
use super::validation::{validate_summary, validate_user_id};
use crate::services::SessionService;

/// Request to create a session
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Identifier of the user who owns the session.
    #[schema(example = "user-42")]
    pub user_id: String,
    /// Optional free-text summary.
    #[serde(default)]
    pub summary: Option<String>,
}

/// Request to update a session. Only provided fields will be updated.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSessionRequest {
    /// Marks the session as ended. Must not be earlier than its start time.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Free-text summary of the session.
    #[serde(default)]
    #[schema(example = "User completed checkout")]
    pub summary: Option<String>,
}

/// App state for sessions routes
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<SessionService>,
}

impl AppState {
    pub fn new(db: Arc<StorageBackend>) -> Self {
        Self {
            session_service: Arc::new(SessionService::new(db)),
        }
    }
}

/// Create session routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/sessions", post(create_session))
        .route(
            "/v1/sessions/:session_id",
            get(get_session)
                .patch(update_session)
                .delete(delete_session),
        )
        .with_state(state)
}

/// POST /v1/sessions - Create a new session
#[utoipa::path(
    post,
    path = "/v1/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created successfully", body = Session),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    validate_user_id(&req.user_id)?;
    validate_summary(req.summary.as_deref())?;

    let session = state
        .session_service
        .create(req)
        .await
        .map_err(|e| service_error("create session", e))?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /v1/sessions/{session_id} - Get session
#[utoipa::path(
    get,
    path = "/v1/sessions/{session_id}",
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session found", body = Session),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .session_service
        .get(session_id)
        .await
        .map_err(|e| service_error("get session", e))?
        .ok_or_else(|| not_found("Session"))?;

    Ok(Json(session))
}

/// PATCH /v1/sessions/{session_id} - End a session or set its summary
#[utoipa::path(
    patch,
    path = "/v1/sessions/{session_id}",
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Session updated successfully", body = Session),
        (status = 400, description = "Invalid update", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<Session>, ApiError> {
    validate_summary(req.summary.as_deref())?;

    let session = state
        .session_service
        .update(session_id, req)
        .await
        .map_err(|e| service_error("update session", e))?
        .ok_or_else(|| not_found("Session"))?;

    Ok(Json(session))
}

/// DELETE /v1/sessions/{session_id} - Delete session and its events
#[utoipa::path(
    delete,
    path = "/v1/sessions/{session_id}",
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 204, description = "Session deleted successfully"),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .session_service
        .delete(session_id)
        .await
        .map_err(|e| service_error("delete session", e))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Session"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_request_minimal() {
        let req: CreateSessionRequest = serde_json::from_str(r#"{"user_id": "u1"}"#).unwrap();
        assert_eq!(req.user_id, "u1");
        assert_eq!(req.summary, None);
    }

    #[test]
    fn test_create_session_request_requires_user() {
        assert!(serde_json::from_str::<CreateSessionRequest>(r#"{"summary": "x"}"#).is_err());
    }

    #[test]
    fn test_update_session_request_parses_end_time() {
        let req: UpdateSessionRequest =
            serde_json::from_str(r#"{"end_time": "2024-05-01T12:00:00Z"}"#).unwrap();
        assert_eq!(
            req.end_time.map(|t| t.to_rfc3339()),
            Some("2024-05-01T12:00:00+00:00".to_string())
        );
        assert_eq!(req.summary, None);
    }
}
