//! Test server harness for lane service integration tests.
//!
//! Spawns a real lane server on an ephemeral port with a scripted pairing
//! code source and a manual clock, so tests can predict codes and move
//! lock-in expiry without waiting.

use common::clock::ManualClock;
use lane_service::actors::GatewayHandle;
use lane_service::config::Config;
use lane_service::observability::HealthState;
use lane_service::registry::ScriptedCodeSource;
use lane_service::transport::build_routes;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Test harness for spawning the lane server.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_pairing() -> Result<(), anyhow::Error> {
///     let server = TestLaneServer::spawn_with_codes(["ABC234"]).await?;
///     let mut admin = TestWsClient::client(&server).await?;
///     admin.send_request(&create_code(VENUE, LANE)).await?;
///     Ok(())
/// }
/// ```
pub struct TestLaneServer {
    addr: SocketAddr,
    gateway: GatewayHandle,
    clock: Arc<ManualClock>,
    health: Arc<HealthState>,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestLaneServer {
    /// Spawn a server with default configuration and random pairing codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_codes(Vec::<String>::new()).await
    }

    /// Spawn a server whose first pairing codes are the given ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind.
    pub async fn spawn_with_codes<I, S>(codes: I) -> Result<Self, anyhow::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::spawn_with(Config::default(), ScriptedCodeSource::new(codes)).await
    }

    /// Spawn a server with explicit configuration and code script.
    ///
    /// `config.bind_address` is ignored; the server always binds an
    /// ephemeral port on localhost.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind.
    pub async fn spawn_with(
        config: Config,
        codes: ScriptedCodeSource,
    ) -> Result<Self, anyhow::Error> {
        let clock = Arc::new(ManualClock::default());
        let gateway = GatewayHandle::with_parts(&config, Box::new(codes), clock.clone());

        // Not installed globally so parallel tests don't fight over the recorder
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let health = Arc::new(HealthState::new());

        let app = build_routes(gateway.clone(), Arc::clone(&health), metrics_handle);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {e}"))?;
        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to read test server address: {e}"))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test lane server error: {e}");
            }
        });

        health.set_ready();

        Ok(Self {
            addr,
            gateway,
            clock,
            health,
            config,
            _handle: handle,
        })
    }

    /// Base HTTP URL, e.g. `http://127.0.0.1:54321`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client WebSocket URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Tracker WebSocket URL.
    pub fn tracker_url(&self) -> String {
        format!("ws://{}/tracker", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Gateway handle, for inspecting lane state directly.
    pub fn gateway(&self) -> &GatewayHandle {
        &self.gateway
    }

    /// Wall clock seen by the lock-in store and lane stamps.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestLaneServer {
    fn drop(&mut self) {
        self.gateway.cancel();
        self._handle.abort();
    }
}
