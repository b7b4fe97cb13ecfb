//! Lane Service
//!
//! Pairing and hit relay server for multi-lane throwing venues.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Spawn the gateway actor (creates the default lane)
//! 4. Bind the HTTP listener and serve `/ws`, `/tracker`, health and metrics
//! 5. Wait for shutdown signal, then drain the server and stop the gateway

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;

use lane_service::actors::GatewayHandle;
use lane_service::config::Config;
use lane_service::observability::{init_metrics_recorder, HealthState};
use lane_service::transport::build_routes;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lane_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Lane Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        default_venue_id = %config.default_venue_id,
        default_lane_id = %config.default_lane_id,
        default_game_mode = %config.default_game_mode,
        lock_in_ttl_seconds = config.lock_in_ttl_seconds,
        lock_in_sweep_interval_seconds = config.lock_in_sweep_interval_seconds,
        status_log_interval_seconds = config.status_log_interval_seconds,
        connection_buffer = config.connection_buffer,
        "Configuration loaded successfully"
    );

    // Must happen before any metrics are recorded
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let health_state = Arc::new(HealthState::new());

    let gateway = GatewayHandle::new(&config);
    let shutdown_token = gateway.child_token();
    info!("Gateway actor started");

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.bind_address, "Invalid bind address");
        format!("Invalid bind address: {e}")
    })?;

    let app = build_routes(
        gateway.clone(),
        Arc::clone(&health_state),
        prometheus_handle,
    );

    // Bind listener BEFORE spawning to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind server");
        format!("Failed to bind server to {addr}: {e}")
    })?;

    let server_token = shutdown_token.child_token();
    let server = tokio::spawn(async move {
        info!(addr = %addr, "Lane server listening");
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            server_token.cancelled().await;
            info!("HTTP server shutting down");
        });
        if let Err(e) = serve.await {
            error!(error = %e, "HTTP server failed");
        }
    });

    health_state.set_ready();
    info!("Lane Service running - press Ctrl+C to shutdown");
    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately so load balancers stop sending traffic
    health_state.set_not_ready();

    // Socket tasks close on their next gateway call once it is cancelled.
    gateway.cancel();
    if let Err(e) = server.await {
        error!(error = %e, "HTTP server task failed");
    }

    info!("Lane Service shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        () = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
