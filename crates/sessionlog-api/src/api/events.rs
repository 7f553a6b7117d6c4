// Event log HTTP routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sessionlog_core::Event;
use sessionlog_storage::StorageBackend;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{not_found, service_error, ApiError, ErrorResponse, ListResponse};
use super::validation::validate_event_type;
use crate::services::EventService;

/// Request to record an event
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Session the event belongs to. Must exist.
    pub session_id: Uuid,
    /// Free-text type tag.
    #[schema(example = "page_view")]
    pub event_type: String,
    /// Arbitrary JSON payload.
    #[schema(example = json!({"path": "/checkout", "duration_ms": 1200}))]
    pub event_data: serde_json::Value,
}

/// App state for events routes
#[derive(Clone)]
pub struct AppState {
    pub event_service: Arc<EventService>,
}

impl AppState {
    pub fn new(db: Arc<StorageBackend>) -> Self {
        Self {
            event_service: Arc::new(EventService::new(db)),
        }
    }
}

/// Create event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", post(create_event))
        .route("/v1/sessions/:session_id/events", get(list_events))
        .with_state(state)
}

/// POST /v1/events - Record an event
#[utoipa::path(
    post,
    path = "/v1/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event recorded", body = Event),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    validate_event_type(&req.event_type)?;

    let event = state
        .event_service
        .create(req)
        .await
        .map_err(|e| service_error("create event", e))?
        .ok_or_else(|| not_found("Session"))?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /v1/sessions/{session_id}/events - List a session's events, oldest first
#[utoipa::path(
    get,
    path = "/v1/sessions/{session_id}/events",
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Events in ascending timestamp order", body = ListResponse<Event>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ListResponse<Event>>, ApiError> {
    let events = state
        .event_service
        .list(session_id)
        .await
        .map_err(|e| service_error("list events", e))?;

    Ok(Json(ListResponse::new(events)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_event_request_keeps_payload() {
        let json = r#"{
            "session_id": "0190b3c4-5d6e-7f80-9a0b-1c2d3e4f5a6b",
            "event_type": "click",
            "event_data": {"target": {"id": "buy", "classes": ["btn"]}}
        }"#;
        let req: CreateEventRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.event_type, "click");
        assert_eq!(req.event_data["target"]["classes"][0], "btn");
    }

    #[test]
    fn test_create_event_request_requires_session() {
        let json = r#"{"event_type": "click", "event_data": {}}"#;
        assert!(serde_json::from_str::<CreateEventRequest>(json).is_err());
    }
}
