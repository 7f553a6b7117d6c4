// Sessionlog API server
// Decision: In-memory dev mode when DATABASE_URL is unset, PostgreSQL otherwise
// Decision: Open WebSockets are closed with a shutdown frame before the server stops

use anyhow::{Context, Result};
use sessionlog_api::{build_app, AppContext, ServerConfig};
use sessionlog_core::telemetry::{init_telemetry, TelemetryConfig};
use sessionlog_realtime::CloseReason;
use sessionlog_storage::StorageBackend;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before reading any configuration
    let dotenv_path = dotenvy::dotenv().ok();

    // Initialize telemetry with OpenTelemetry support
    // Configure via environment variables:
    // - OTEL_SERVICE_NAME: Service name (default: "sessionlog")
    // - OTEL_EXPORTER_OTLP_ENDPOINT: OTLP endpoint (e.g., "http://localhost:4317")
    // - RUST_LOG: Log filter (default: "sessionlog_api=debug,tower_http=debug")
    let mut telemetry_config = TelemetryConfig::from_env();
    if telemetry_config.service_name == "sessionlog" {
        telemetry_config.service_name = "sessionlog-api".to_string();
    }
    if telemetry_config.log_filter.is_none() {
        telemetry_config.log_filter = Some(
            "sessionlog_api=debug,sessionlog_realtime=debug,tower_http=debug".to_string(),
        );
    }
    telemetry_config.service_version = Some(env!("CARGO_PKG_VERSION").to_string());

    // Keep the guard alive for the lifetime of the application
    let _telemetry_guard = init_telemetry(telemetry_config);

    if let Some(path) = dotenv_path {
        tracing::info!("Loaded .env from {:?}", path);
    }
    tracing::info!("sessionlog-api starting...");

    let config = ServerConfig::from_env();

    let storage = match &config.database_url {
        Some(url) => {
            let backend = StorageBackend::postgres(url, config.database_max_connections)
                .await
                .context("Failed to connect to database")?;
            tracing::info!(
                max_connections = config.database_max_connections,
                "Connected to database"
            );
            backend
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (data is lost on restart)");
            StorageBackend::in_memory()
        }
    };

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }
    if config.cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS origins configured");
    }
    tracing::info!(
        duplicate_policy = ?config.realtime.duplicate_policy,
        outbound_buffer = config.realtime.outbound_buffer,
        idle_timeout = ?config.realtime.idle_timeout,
        presence = config.realtime.presence,
        "Realtime configured"
    );

    let ctx = AppContext::new(storage, config);
    let app = build_app(&ctx);

    let addr = ctx.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!("HTTP server listening on {}", addr);

    let registry = ctx.registry.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            tracing::info!("Received shutdown signal");
            let closed = registry.close_all(CloseReason::Shutdown);
            tracing::info!(connections = closed, "Closed realtime connections");
        })
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
