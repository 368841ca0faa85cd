//! Road-safety server - always-on backend for near-miss detection and alerts.

use anyhow::Result;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roadsafe_server::api;
use roadsafe_server::config::Config;
use roadsafe_server::loops;
use roadsafe_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roadsafe_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting road-safety server...");

    let config = Config::from_env();
    let port = config.server_port;
    let state = Arc::new(AppState::new(config));

    // Start background loops
    tokio::spawn(loops::expiry_loop::run_expiry_loop(state.clone()));

    // Build the app
    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(CorsLayer::permissive());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
