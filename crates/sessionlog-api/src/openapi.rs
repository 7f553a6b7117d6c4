// OpenAPI document generation
//
// Served by the API server under /api-doc/openapi.json with Swagger UI.

use crate::api;
use crate::api::{ErrorResponse, ListResponse};
use sessionlog_core::{Event, Session};
use utoipa::OpenApi;

/// OpenAPI documentation for the Sessionlog API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::sessions::create_session,
        api::sessions::get_session,
        api::sessions::update_session,
        api::sessions::delete_session,
        api::events::create_event,
        api::events::list_events,
        api::realtime::list_clients,
        api::realtime::ws_handler,
    ),
    components(
        schemas(
            Session, Event, ErrorResponse,
            api::sessions::CreateSessionRequest, api::sessions::UpdateSessionRequest,
            api::events::CreateEventRequest,
            ListResponse<Event>,
            ListResponse<String>,
        )
    ),
    tags(
        (name = "sessions", description = "Session management endpoints"),
        (name = "events", description = "Event log endpoints"),
        (name = "realtime", description = "WebSocket echo/broadcast endpoints")
    ),
    info(
        title = "Sessionlog API",
        version = "0.1.0",
        description = "API for recording sessions and events, with a WebSocket broadcast channel",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;
