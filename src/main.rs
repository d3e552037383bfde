//! chatwire server entry point.
//!
//! Starts the Axum HTTP server with the `/ws` upgrade endpoint and the
//! health route.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chatwire::api;
use chatwire::app_state::AppState;
use chatwire::config::ServerConfig;
use chatwire::ws::handler::ws_handler;
use chatwire::ws::hub::Hub;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting chatwire");

    // One hub shared by reference with every session task.
    let hub = Arc::new(Hub::new());

    let app_state = AppState {
        hub,
        config: config.clone(),
    };

    // Build router. The timeout bounds only plain HTTP requests and the
    // upgrade negotiation; established WebSocket streams are exempt.
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
