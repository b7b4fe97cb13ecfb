//! Health endpoints.
//!
//! - `GET /health` - liveness, `{"status":"ok","timestamp":<RFC 3339>}`
//! - `GET /ready` - readiness, 200 once the gateway runs, 503 otherwise
//!
//! The `/metrics` route is added separately in [`crate::transport::routes`].

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Server lifecycle as seen by `/ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Listener not yet bound.
    Starting,
    /// Accepting sockets.
    Serving,
    /// Shutdown signalled; existing sockets are being dropped.
    Draining,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Serving => "serving",
            Phase::Draining => "draining",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Phase::Serving,
            2 => Phase::Draining,
            _ => Phase::Starting,
        }
    }
}

/// Readiness flag shared between `main` and the health routes.
///
/// Liveness has no state: if the process can answer `/health`, it is live.
#[derive(Debug)]
pub struct HealthState {
    phase: AtomicU8,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Starts in [`Phase::Starting`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Starting as u8),
        }
    }

    pub fn set_ready(&self) {
        self.phase.store(Phase::Serving as u8, Ordering::SeqCst);
    }

    /// Enter [`Phase::Draining`]. There is no way back to serving.
    pub fn set_not_ready(&self) {
        self.phase.store(Phase::Draining as u8, Ordering::SeqCst);
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Serving
    }
}

/// Body of a `/health` response.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub timestamp: String,
}

/// `/health` and `/ready`.
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness))
        .route("/ready", get(readiness))
        .with_state(health_state)
}

async fn liveness() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

async fn readiness(State(state): State<Arc<HealthState>>) -> (StatusCode, &'static str) {
    let phase = state.phase();
    let status = if phase == Phase::Serving {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, phase.as_str())
}
