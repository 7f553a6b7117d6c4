// Sessionlog API library
// Decision: Router assembly lives here so the binary and the integration tests build the same app

// API routes and types (shared for OpenAPI generation)
pub mod api;

// Environment configuration
pub mod config;

// Services layer
pub mod services;

// OpenAPI spec generation
pub mod openapi;

use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sessionlog_realtime::ConnectionRegistry;
use sessionlog_storage::StorageBackend;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::{RealtimeConfig, ServerConfig};
pub use openapi::ApiDoc;

/// Shared resources every route group is built from.
#[derive(Clone)]
pub struct AppContext {
    pub storage: Arc<StorageBackend>,
    pub registry: Arc<ConnectionRegistry>,
    pub config: ServerConfig,
}

impl AppContext {
    pub fn new(storage: StorageBackend, config: ServerConfig) -> Self {
        let registry = ConnectionRegistry::with_policy(config.realtime.duplicate_policy);
        Self {
            storage: Arc::new(storage),
            registry: Arc::new(registry),
            config,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    storage: &'static str,
    realtime_connections: usize,
}

/// State for health endpoint
#[derive(Clone)]
struct HealthState {
    storage: Arc<StorageBackend>,
    registry: Arc<ConnectionRegistry>,
}

async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status) = match state.storage.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!("Storage health check failed: {:#}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };
    (
        status_code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            storage: state.storage.kind(),
            realtime_connections: state.registry.len(),
        }),
    )
}

/// Build the full application router.
pub fn build_app(ctx: &AppContext) -> Router {
    let sessions_state = api::sessions::AppState::new(ctx.storage.clone());
    let events_state = api::events::AppState::new(ctx.storage.clone());
    let realtime_state =
        api::realtime::AppState::new(ctx.registry.clone(), ctx.config.realtime.clone());
    let health_state = HealthState {
        storage: ctx.storage.clone(),
        registry: ctx.registry.clone(),
    };

    let api_routes = Router::new()
        .merge(api::sessions::routes(sessions_state))
        .merge(api::events::routes(events_state))
        .merge(api::realtime::routes(realtime_state.clone()));

    // Health and the WebSocket entry points are never prefixed
    let app = Router::new()
        .route("/health", get(health).with_state(health_state))
        .merge(api::realtime::ws_routes(realtime_state))
        .merge(build_router_with_prefix(api_routes, &ctx.config.api_prefix))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    // Add CORS layer only if origins are configured
    let app = if !ctx.config.cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(ctx.config.cors_origins.clone()))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]),
        )
    } else {
        app
    };

    app.layer(TraceLayer::new_for_http())
}

/// Build router with optional API prefix (extracted for testing)
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
