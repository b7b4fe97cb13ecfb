//! HTTP and WebSocket surface.
//!
//! - [`routes`] - axum router: socket upgrades, health, metrics
//! - [`websocket`] - per-socket reader and writer tasks

pub mod routes;
pub mod websocket;

pub use routes::{build_routes, AppState};
