// Realtime WebSocket routes
//
// GET /ws/:client_id upgrades to a WebSocket and registers the connection.
// Every text frame a client sends is echoed back to it and relayed to all
// other connected clients.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use sessionlog_realtime::{
    run_connection, ConnectionHandle, ConnectionRegistry, DuplicatePolicy, Inbound, Outbound,
    PresenceNotice,
};
use tracing::{debug, info, warn};

use super::common::{ErrorResponse, ListResponse};
use super::validation::validate_client_id;
use crate::config::RealtimeConfig;

/// Close code sent when a duplicate client id is refused.
const CLOSE_DUPLICATE: u16 = 4002;

/// How long the writer may keep flushing after the receive loop ended.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const TEST_PAGE: &str = include_str!("../../static/websocket_client.html");

/// App state for realtime routes
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub config: RealtimeConfig,
}

impl AppState {
    pub fn new(registry: Arc<ConnectionRegistry>, config: RealtimeConfig) -> Self {
        Self { registry, config }
    }
}

/// Versioned realtime routes (mounted under the API prefix)
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/realtime/clients", get(list_clients))
        .with_state(state)
}

/// WebSocket endpoint and browser test page (never prefixed)
pub fn ws_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws/:client_id", get(ws_handler))
        .route("/websocket_test", get(websocket_test_page))
        .with_state(state)
}

/// GET /v1/realtime/clients - List connected client ids
#[utoipa::path(
    get,
    path = "/v1/realtime/clients",
    responses(
        (status = 200, description = "Connected client ids, sorted", body = ListResponse<String>)
    ),
    tag = "realtime"
)]
pub async fn list_clients(State(state): State<AppState>) -> Json<ListResponse<String>> {
    Json(ListResponse::new(state.registry.client_ids()))
}

/// GET /ws/{client_id} - Upgrade to a WebSocket
#[utoipa::path(
    get,
    path = "/ws/{client_id}",
    params(
        ("client_id" = String, Path, description = "Client-chosen identifier")
    ),
    responses(
        (status = 101, description = "Switching protocols"),
        (status = 400, description = "Invalid client id", body = ErrorResponse),
        (status = 409, description = "Client id already connected (reject policy)", body = ErrorResponse)
    ),
    tag = "realtime"
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    if let Err(e) = validate_client_id(&client_id) {
        return e.into_response();
    }

    // Fast path for the reject policy; register() still decides races.
    if state.config.duplicate_policy == DuplicatePolicy::Reject
        && state.registry.contains(&client_id)
    {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("Client id already connected")),
        )
            .into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, client_id, state))
}

/// Core WebSocket session logic.
async fn handle_socket(socket: WebSocket, client_id: String, state: AppState) {
    let (handle, mut outbound) =
        ConnectionHandle::channel(client_id.as_str(), state.config.outbound_buffer);
    let (mut sink, stream) = socket.split();

    if let Err(e) = state.registry.register(handle.clone()) {
        warn!(client_id = %client_id, "Refusing connection: {}", e);
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_DUPLICATE,
                reason: "client id already connected".into(),
            })))
            .await;
        return;
    }
    let connection_id = handle.id();
    info!(client_id = %client_id, connection_id = %connection_id, "Client connected");

    if state.config.presence {
        state
            .registry
            .broadcast_all(PresenceNotice::joined(client_id.as_str()).to_json());
    }

    // Writer task: registry frames -> WS sink. Ends when every handle is
    // dropped, on a close frame, or when the socket stops accepting writes.
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            match frame {
                Outbound::Text(text) => {
                    if sink.send(Message::Text(text.to_string())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close(reason) => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code: reason.code(),
                            reason: reason.as_str().into(),
                        })))
                        .await;
                    break;
                }
            }
        }
        let _ = sink.close().await;
    });

    let inbound = stream.map(|frame| frame.map(classify));
    let reader = run_connection(
        state.registry.clone(),
        handle.clone(),
        inbound,
        state.config.connection_options(),
    );
    tokio::pin!(reader);

    // Wait for either side to finish.
    let reader_done = tokio::select! {
        _ = &mut reader => true,
        _ = &mut writer => false,
    };

    if reader_done {
        // Dropping the last handle lets the writer drain and close.
        drop(handle);
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
            .await
            .is_err()
        {
            writer.abort();
        }
    } else {
        // The socket can no longer be written to.
        state.registry.unregister_connection(&handle);
        debug!(client_id = %client_id, connection_id = %connection_id, "Writer ended first");
    }

    // A superseding connection keeps the id present; only announce real leaves.
    if state.config.presence && !state.registry.contains(&client_id) {
        state
            .registry
            .broadcast_all(PresenceNotice::left(client_id.as_str()).to_json());
    }
    debug!(client_id = %client_id, connection_id = %connection_id, "WS session cleaned up");
}

fn classify(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Text(text),
        Message::Close(_) => Inbound::Closed,
        // Binary / Ping / Pong handled by Axum
        _ => Inbound::Ignored,
    }
}

/// GET /websocket_test - Browser page for trying the WebSocket endpoint
pub async fn websocket_test_page() -> Html<&'static str> {
    Html(TEST_PAGE)
}
