//! HTTP routes for the lane server.

use super::websocket;
use crate::actors::GatewayHandle;
use crate::observability::{health_router, HealthState};

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// State shared by the WebSocket upgrade handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: GatewayHandle,
}

/// Build the application routes.
///
/// - `/ws` - client WebSocket (admin, user, projector)
/// - `/tracker` - tracker WebSocket (raw hit feed)
/// - `/health`, `/ready` - liveness and readiness
/// - `/metrics` - Prometheus text exposition
///
/// Anything else is a 404.
pub fn build_routes(
    gateway: GatewayHandle,
    health_state: Arc<HealthState>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let socket_routes = Router::new()
        .route("/ws", get(websocket::client_upgrade))
        .route("/tracker", get(websocket::tracker_upgrade))
        .with_state(Arc::new(AppState { gateway }));

    let metrics_routes = Router::new().route(
        "/metrics",
        get(move || {
            let handle = metrics_handle.clone();
            async move { handle.render() }
        }),
    );

    socket_routes
        .merge(health_router(health_state))
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
}
