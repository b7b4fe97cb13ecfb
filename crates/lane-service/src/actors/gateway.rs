//! `GatewayActor` - the session gateway.
//!
//! Single actor task that owns every piece of mutable server state:
//!
//! - the [`LaneRegistry`] (lane states and the code index)
//! - the [`LockInStore`]
//! - the [`Dispatcher`] subscription table
//!
//! Socket tasks send it [`GatewayMessage`]s; each message is handled to
//! completion before the next, so a close and a racing join are totally
//! ordered and no lock is needed. Broadcasts are queued only after the
//! mutation has been applied.
//!
//! The run loop also drives two timers: the expired lock-in sweep and the
//! periodic status log.

use super::connection::{Binding, ConnectionHandle, ConnectionId, ConnectionKind};
use super::dispatcher::Dispatcher;
use super::messages::{GatewayMessage, GatewayStatus};
use super::metrics::MailboxMonitor;
use super::relay;
use crate::config::Config;
use crate::errors::{LaneError, RejoinFailure};
use crate::observability::metrics;
use crate::registry::{check_against_lane, CodeSource, LaneRegistry, LockInStore, RandomCodeSource};

use common::clock::{Clock, SystemClock};
use common::types::{DeviceClass, DeviceId, LaneId, VenueId};
use lane_protocol::{ClientRequest, LaneState, PairingCode, RawHit, ServerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Gateway mailbox capacity.
const GATEWAY_CHANNEL_BUFFER: usize = 1000;

/// Handle to the `GatewayActor`.
///
/// Cheap to clone; every socket task holds one.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    sender: mpsc::Sender<GatewayMessage>,
    cancel_token: CancellationToken,
    mailbox: Arc<MailboxMonitor>,
    connection_buffer: usize,
}

impl GatewayHandle {
    /// Spawn the gateway with random pairing codes and the system clock.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_parts(config, Box::new(RandomCodeSource::new()), Arc::new(SystemClock))
    }

    /// Spawn the gateway with an explicit code source and clock.
    #[must_use]
    pub fn with_parts(
        config: &Config,
        codes: Box<dyn CodeSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(GATEWAY_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();
        let mailbox = Arc::new(MailboxMonitor::new());

        let actor = GatewayActor::new(
            config,
            receiver,
            cancel_token.clone(),
            Arc::clone(&mailbox),
            codes,
            clock,
        );
        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
            mailbox,
            connection_buffer: config.connection_buffer,
        }
    }

    /// Register a new socket. Returns its handle and the receiver its writer
    /// task drains.
    pub async fn connect(
        &self,
        kind: ConnectionKind,
    ) -> Result<(ConnectionHandle, mpsc::Receiver<ServerEvent>), LaneError> {
        let (connection, receiver) = ConnectionHandle::new(kind, self.connection_buffer);

        let (tx, rx) = oneshot::channel();
        self.send(GatewayMessage::Register {
            connection: connection.clone(),
            respond_to: tx,
        })
        .await?;

        rx.await
            .map_err(|e| LaneError::Internal(format!("response receive failed: {e}")))?;
        Ok((connection, receiver))
    }

    /// Handle a client request. Failures have already been reported to the
    /// requesting socket when this returns `Err`.
    pub async fn request(
        &self,
        connection_id: ConnectionId,
        request: ClientRequest,
    ) -> Result<(), LaneError> {
        let (tx, rx) = oneshot::channel();
        self.send(GatewayMessage::Request {
            connection_id,
            request,
            respond_to: tx,
        })
        .await?;

        rx.await
            .map_err(|e| LaneError::Internal(format!("response receive failed: {e}")))?
    }

    /// Queue a validated tracker event. Waits only for mailbox capacity.
    pub async fn relay_hit(&self, connection_id: ConnectionId, hit: RawHit) -> Result<(), LaneError> {
        self.send(GatewayMessage::RelayHit { connection_id, hit })
            .await
    }

    /// Tell the gateway a socket has closed.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<(), LaneError> {
        self.send(GatewayMessage::Disconnect { connection_id })
            .await
    }

    pub async fn status(&self) -> Result<GatewayStatus, LaneError> {
        let (tx, rx) = oneshot::channel();
        self.send(GatewayMessage::GetStatus { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| LaneError::Internal(format!("response receive failed: {e}")))
    }

    /// Snapshot of one lane, if it exists.
    pub async fn lane(&self, lane_id: LaneId) -> Result<Option<LaneState>, LaneError> {
        let (tx, rx) = oneshot::channel();
        self.send(GatewayMessage::GetLane {
            lane_id,
            respond_to: tx,
        })
        .await?;

        rx.await
            .map_err(|e| LaneError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the actor (for immediate shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get a child token for tasks that should stop with the gateway.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    async fn send(&self, message: GatewayMessage) -> Result<(), LaneError> {
        self.mailbox.record_enqueue();
        if let Err(e) = self.sender.send(message).await {
            self.mailbox.record_abandoned();
            return Err(LaneError::Internal(format!("channel send failed: {e}")));
        }
        Ok(())
    }
}

/// Which event a failed request is answered with.
#[derive(Debug, Clone, Copy)]
enum ErrorReply {
    Pairing,
    Rejoin,
    Generic,
}

/// The `GatewayActor` implementation.
pub struct GatewayActor {
    receiver: mpsc::Receiver<GatewayMessage>,
    cancel_token: CancellationToken,
    mailbox: Arc<MailboxMonitor>,
    registry: LaneRegistry,
    lock_ins: LockInStore,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
    status_interval: Duration,
    /// Hits relayed since the last status log.
    hits_since_status: u64,
}

impl GatewayActor {
    fn new(
        config: &Config,
        receiver: mpsc::Receiver<GatewayMessage>,
        cancel_token: CancellationToken,
        mailbox: Arc<MailboxMonitor>,
        codes: Box<dyn CodeSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut registry =
            LaneRegistry::new(codes, Arc::clone(&clock), config.default_game_mode.clone());
        registry.get_or_create(&config.default_lane_id, &config.default_venue_id);

        Self {
            receiver,
            cancel_token,
            mailbox,
            registry,
            lock_ins: LockInStore::new(config.lock_in_ttl(), Arc::clone(&clock)),
            dispatcher: Dispatcher::new(),
            clock,
            sweep_interval: config.lock_in_sweep_interval(),
            status_interval: config.status_log_interval(),
            hits_since_status: 0,
        }
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "lane.actor.gateway")]
    async fn run(mut self) {
        info!(
            target: "lane.gateway",
            lanes = self.registry.len(),
            "GatewayActor started"
        );

        let mut sweep = ticker(self.sweep_interval);
        let mut status = ticker(self.status_interval);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "lane.gateway",
                        "GatewayActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.handle_message(message);
                            self.mailbox.record_dequeue();
                        }
                        None => {
                            info!(
                                target: "lane.gateway",
                                "GatewayActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }

                _ = sweep.tick() => self.sweep_lock_ins(),

                _ = status.tick() => self.log_status(),
            }
        }

        info!(
            target: "lane.gateway",
            lanes = self.registry.len(),
            connections = self.dispatcher.count(ConnectionKind::Client)
                + self.dispatcher.count(ConnectionKind::Tracker),
            messages_processed = self.mailbox.messages_processed(),
            "GatewayActor stopped"
        );
    }

    fn handle_message(&mut self, message: GatewayMessage) {
        match message {
            GatewayMessage::Register {
                connection,
                respond_to,
            } => {
                debug!(
                    target: "lane.gateway",
                    connection_id = %connection.id(),
                    kind = connection.kind().as_str(),
                    "Connection registered"
                );
                self.dispatcher.add(connection);
                self.publish_connection_gauges();
                let _ = respond_to.send(());
            }

            GatewayMessage::Request {
                connection_id,
                request,
                respond_to,
            } => {
                let result = self.handle_request(connection_id, request);
                metrics::set_lanes_open(self.registry.open_lane_count());
                let _ = respond_to.send(result);
            }

            GatewayMessage::RelayHit { connection_id, hit } => {
                let hit = relay::relay_hit(&self.dispatcher, hit, self.clock.now_millis());
                self.hits_since_status = self.hits_since_status.saturating_add(1);
                debug!(
                    target: "lane.relay",
                    tracker_id = %connection_id,
                    lane_id = %hit.lane_id,
                    "Tracker event accepted"
                );
            }

            GatewayMessage::Disconnect { connection_id } => {
                self.disconnect(connection_id);
                self.publish_connection_gauges();
            }

            GatewayMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.status());
            }

            GatewayMessage::GetLane {
                lane_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.registry.find(&lane_id).cloned());
            }
        }
    }

    fn handle_request(
        &mut self,
        connection_id: ConnectionId,
        request: ClientRequest,
    ) -> Result<(), LaneError> {
        let name = request.name();
        let reply = match &request {
            ClientRequest::JoinWithCode { .. } => ErrorReply::Pairing,
            ClientRequest::AutoRejoin { .. } => ErrorReply::Rejoin,
            _ => ErrorReply::Generic,
        };

        let result = match request {
            ClientRequest::WatchVenue { venue_id } => self.watch_venue(connection_id, venue_id),
            ClientRequest::CreatePairingCode { venue_id, lane_id } => {
                self.create_pairing_code(connection_id, venue_id, lane_id)
            }
            ClientRequest::CloseLane { lane_id, .. } => self.close_lane(lane_id),
            ClientRequest::StartLane {
                lane_id, game_mode, ..
            } => self.start_lane(lane_id, game_mode),
            ClientRequest::JoinWithCode {
                code,
                client_type,
                device_id,
            } => self.join_with_code(connection_id, code, client_type, device_id),
            ClientRequest::AutoRejoin {
                device_id,
                client_type,
            } => self.auto_rejoin(connection_id, device_id, client_type),
            ClientRequest::UpdateLocation { location } => {
                self.update_location(connection_id, location)
            }
            ClientRequest::GetCurrentTransform { lane_id } => required_lane(lane_id)
                .map(|lane_id| {
                    relay::request_transform(&self.dispatcher, lane_id);
                }),
            ClientRequest::CurrentTransform { lane_id, transform } => required_lane(lane_id)
                .map(|lane_id| {
                    relay::current_transform(&self.dispatcher, connection_id, lane_id, transform);
                }),
            ClientRequest::UpdateTransform { lane_id, transform } => required_lane(lane_id)
                .map(|lane_id| {
                    relay::update_transform(&self.dispatcher, lane_id, transform);
                }),
        };

        if let Err(e) = &result {
            self.report_error(connection_id, name, reply, e);
        }
        result
    }

    fn report_error(
        &self,
        connection_id: ConnectionId,
        request: &'static str,
        reply: ErrorReply,
        error: &LaneError,
    ) {
        if let LaneError::Internal(_) = error {
            warn!(
                target: "lane.gateway",
                connection_id = %connection_id,
                request,
                error = %error,
                "Request failed"
            );
        } else {
            debug!(
                target: "lane.gateway",
                connection_id = %connection_id,
                request,
                error = %error,
                "Request rejected"
            );
        }

        let message = error.client_message();
        let event = match reply {
            ErrorReply::Pairing => ServerEvent::PairingError { message },
            ErrorReply::Rejoin => ServerEvent::AutoRejoinFailed { message },
            ErrorReply::Generic => ServerEvent::Error {
                code: error.error_code(),
                message,
            },
        };
        self.dispatcher.send_to(connection_id, event);
    }

    // ------------------------------------------------------------------
    // Admin operations
    // ------------------------------------------------------------------

    fn watch_venue(
        &mut self,
        connection_id: ConnectionId,
        venue_id: Option<VenueId>,
    ) -> Result<(), LaneError> {
        let venue_id = required_venue(venue_id)?;
        self.dispatcher.watch_venue(connection_id, &venue_id);
        let lanes = self.registry.lanes_for_venue(&venue_id);
        self.dispatcher
            .send_to(connection_id, ServerEvent::VenueLanes { venue_id, lanes });
        Ok(())
    }

    /// Issue a fresh code. The code itself goes only to the requester.
    fn create_pairing_code(
        &mut self,
        connection_id: ConnectionId,
        venue_id: Option<VenueId>,
        lane_id: Option<LaneId>,
    ) -> Result<(), LaneError> {
        let venue_id = required_venue(venue_id)?;
        let lane_id = required_lane(lane_id)?;

        let prior = self.registry.get_or_create(&lane_id, &venue_id).pairing_code;
        let state = self.registry.issue_pairing_code(&lane_id)?;
        let lock_ins_removed = prior
            .map_or(0, |prior| self.lock_ins.remove_for_code(&lane_id, &prior));
        let code = state
            .pairing_code
            .clone()
            .ok_or_else(|| LaneError::Internal(format!("lane {lane_id} has no code after issue")))?;

        info!(
            target: "lane.gateway",
            lane_id = %lane_id,
            venue_id = %state.venue_id,
            lock_ins_removed,
            "Pairing code issued"
        );
        self.dispatcher.send_to(
            connection_id,
            ServerEvent::PairingCodeCreated {
                code,
                lane_id,
                venue_id: state.venue_id.clone(),
            },
        );
        self.dispatcher.broadcast_state(&state);
        Ok(())
    }

    /// Close a lane and evict everything bound to it.
    fn close_lane(&mut self, lane_id: Option<LaneId>) -> Result<(), LaneError> {
        let lane_id = required_lane(lane_id)?;

        let state = self.registry.close(&lane_id)?;
        let lock_ins_removed = self.lock_ins.remove_all_for_lane(&lane_id);
        self.dispatcher.broadcast_state(&state);

        let evicted = self.dispatcher.unbind_lane(&lane_id);
        for (connection_id, _) in &evicted {
            self.dispatcher.send_to(
                *connection_id,
                ServerEvent::LaneClosed {
                    venue_id: state.venue_id.clone(),
                    lane_id: lane_id.clone(),
                },
            );
        }

        info!(
            target: "lane.gateway",
            lane_id = %lane_id,
            evicted = evicted.len(),
            lock_ins_removed,
            "Lane closed"
        );
        Ok(())
    }

    fn start_lane(
        &mut self,
        lane_id: Option<LaneId>,
        game_mode: Option<String>,
    ) -> Result<(), LaneError> {
        let lane_id = required_lane(lane_id)?;
        let state = self.registry.start_session(&lane_id, game_mode)?;
        info!(
            target: "lane.gateway",
            lane_id = %lane_id,
            game_mode = state.game_mode.as_deref().unwrap_or_default(),
            "Lane session started"
        );
        self.dispatcher.broadcast_state(&state);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Device operations
    // ------------------------------------------------------------------

    fn join_with_code(
        &mut self,
        connection_id: ConnectionId,
        code: Option<String>,
        client_type: Option<DeviceClass>,
        device_id: Option<DeviceId>,
    ) -> Result<(), LaneError> {
        let result = self.try_join_with_code(connection_id, code, client_type, device_id);
        let outcome = match &result {
            Ok(true) => "continued",
            Ok(false) => "joined",
            Err(LaneError::MissingField(_)) => "missing_field",
            Err(_) => "invalid_code",
        };
        metrics::record_pairing_join(outcome);
        result.map(|_| ())
    }

    /// Returns whether an existing lock-in was continued.
    fn try_join_with_code(
        &mut self,
        connection_id: ConnectionId,
        code: Option<String>,
        client_type: Option<DeviceClass>,
        device_id: Option<DeviceId>,
    ) -> Result<bool, LaneError> {
        let code = code
            .map(|raw| PairingCode::normalize(&raw))
            .filter(|code| !code.is_empty())
            .ok_or(LaneError::MissingField("code"))?;
        let class = client_type.ok_or(LaneError::MissingField("clientType"))?;
        let device_id = required_device(device_id)?;

        let lane = self
            .registry
            .find_by_active_code(&code)
            .cloned()
            .ok_or(LaneError::InvalidOrClosedCode)?;

        // Re-joining the same lane with the same code keeps the original expiry.
        let continued = self
            .lock_ins
            .validate(&device_id)
            .is_ok_and(|lock_in| lock_in.lane_id == lane.lane_id && lock_in.code == code);
        if !continued {
            self.lock_ins.create(
                device_id.clone(),
                lane.lane_id.clone(),
                lane.venue_id.clone(),
                code,
            );
        }

        let state = self.bind_device(
            connection_id,
            Binding {
                lane_id: lane.lane_id.clone(),
                venue_id: lane.venue_id.clone(),
                device_id: device_id.clone(),
                class,
            },
        )?;

        info!(
            target: "lane.gateway",
            connection_id = %connection_id,
            device_id = %device_id,
            lane_id = %lane.lane_id,
            client_type = class.as_str(),
            continued,
            "Device paired"
        );
        self.dispatcher.send_to(
            connection_id,
            ServerEvent::PairingJoined {
                ok: true,
                venue_id: lane.venue_id,
                lane_id: lane.lane_id,
                state: state.clone(),
            },
        );
        self.dispatcher.broadcast_state(&state);
        Ok(continued)
    }

    fn auto_rejoin(
        &mut self,
        connection_id: ConnectionId,
        device_id: Option<DeviceId>,
        client_type: Option<DeviceClass>,
    ) -> Result<(), LaneError> {
        let result = self.try_auto_rejoin(connection_id, device_id, client_type);
        let outcome = match &result {
            Ok(()) => "success",
            Err(LaneError::RejoinFailed(reason)) => reason.as_str(),
            Err(LaneError::MissingField(_)) => "missing_field",
            Err(_) => "error",
        };
        metrics::record_auto_rejoin(outcome);
        result
    }

    fn try_auto_rejoin(
        &mut self,
        connection_id: ConnectionId,
        device_id: Option<DeviceId>,
        client_type: Option<DeviceClass>,
    ) -> Result<(), LaneError> {
        let device_id = required_device(device_id)?;
        let class = client_type.ok_or(LaneError::MissingField("clientType"))?;

        let checked = self.lock_ins.validate(&device_id).and_then(|lock_in| {
            check_against_lane(lock_in, self.registry.find(&lock_in.lane_id))
                .map(|()| lock_in.clone())
        });
        let lock_in = match checked {
            Ok(lock_in) => lock_in,
            Err(reason) => {
                if reason != RejoinFailure::NoLockIn {
                    self.lock_ins.remove(&device_id);
                }
                return Err(reason.into());
            }
        };

        let state = self.bind_device(
            connection_id,
            Binding {
                lane_id: lock_in.lane_id.clone(),
                venue_id: lock_in.venue_id.clone(),
                device_id: device_id.clone(),
                class,
            },
        )?;

        info!(
            target: "lane.gateway",
            connection_id = %connection_id,
            device_id = %device_id,
            lane_id = %lock_in.lane_id,
            client_type = class.as_str(),
            "Device rejoined from lock-in"
        );
        self.dispatcher.send_to(
            connection_id,
            ServerEvent::AutoRejoinSuccess {
                venue_id: lock_in.venue_id,
                lane_id: lock_in.lane_id,
                state: state.clone(),
            },
        );
        self.dispatcher.broadcast_state(&state);
        Ok(())
    }

    fn update_location(
        &mut self,
        connection_id: ConnectionId,
        location: Option<String>,
    ) -> Result<(), LaneError> {
        let location = location.ok_or(LaneError::MissingField("location"))?;

        let Some(lane_id) = self
            .dispatcher
            .binding(connection_id)
            .filter(|binding| binding.class == DeviceClass::User)
            .map(|binding| binding.lane_id.clone())
        else {
            debug!(
                target: "lane.gateway",
                connection_id = %connection_id,
                "Location update from unbound connection ignored"
            );
            return Ok(());
        };

        let state = self.registry.set_user_location(&lane_id, location)?;
        self.dispatcher.broadcast_state(&state);
        Ok(())
    }

    /// Mark the device present and bind the connection, releasing any
    /// binding the connection held before.
    fn bind_device(
        &mut self,
        connection_id: ConnectionId,
        binding: Binding,
    ) -> Result<LaneState, LaneError> {
        let lane_id = binding.lane_id.clone();
        let mut state = self
            .registry
            .set_device_paired(&lane_id, binding.class, true)?;

        if let Some(previous) = self.dispatcher.bind(connection_id, binding) {
            if let Some(released) = self.release_presence(&previous) {
                if released.lane_id == lane_id {
                    state = released;
                } else {
                    self.dispatcher.broadcast_state(&released);
                }
            }
        }
        Ok(state)
    }

    /// Recompute a presence flag after one of its bindings went away.
    ///
    /// Returns the new state if the flag changed.
    fn release_presence(&mut self, binding: &Binding) -> Option<LaneState> {
        let still_present = self.dispatcher.bound_count(&binding.lane_id, binding.class) > 0;
        let lane = self.registry.find(&binding.lane_id)?;
        if lane.paired_devices.get(binding.class) == still_present {
            return None;
        }
        self.registry
            .set_device_paired(&binding.lane_id, binding.class, still_present)
            .ok()
    }

    /// Drop the connection. Its lock-in is kept for auto-rejoin.
    fn disconnect(&mut self, connection_id: ConnectionId) {
        let kind = self.dispatcher.kind(connection_id);
        let binding = self.dispatcher.remove(connection_id);

        debug!(
            target: "lane.gateway",
            connection_id = %connection_id,
            kind = kind.map(|k| k.as_str()),
            bound = binding.is_some(),
            "Connection removed"
        );

        if let Some(binding) = binding {
            if let Some(state) = self.release_presence(&binding) {
                self.dispatcher.broadcast_state(&state);
            }
        }
    }

    // ------------------------------------------------------------------
    // Housekeeping
    // ------------------------------------------------------------------

    fn sweep_lock_ins(&mut self) {
        let removed = self.lock_ins.sweep();
        if removed > 0 {
            debug!(
                target: "lane.lock_in",
                removed,
                remaining = self.lock_ins.len(),
                "Expired lock-ins swept"
            );
            metrics::record_lock_ins_swept(removed);
        }
    }

    fn log_status(&mut self) {
        let status = self.status();
        #[allow(clippy::cast_precision_loss)]
        let hits_per_sec = self.hits_since_status as f64 / self.status_interval.as_secs_f64();
        self.hits_since_status = 0;

        info!(
            target: "lane.gateway",
            trackers = status.trackers,
            clients = status.clients,
            lanes = status.lanes,
            open_lanes = status.open_lanes,
            lock_ins = status.lock_ins,
            hits_per_sec,
            mailbox_peak = self.mailbox.peak_depth(),
            mailbox_level = ?self.mailbox.current_level(),
            "Status"
        );
        self.mailbox.reset_peak();
    }

    fn status(&self) -> GatewayStatus {
        GatewayStatus {
            clients: self.dispatcher.count(ConnectionKind::Client),
            trackers: self.dispatcher.count(ConnectionKind::Tracker),
            lanes: self.registry.len(),
            open_lanes: self.registry.open_lane_count(),
            lock_ins: self.lock_ins.len(),
        }
    }

    fn publish_connection_gauges(&self) {
        for kind in [ConnectionKind::Client, ConnectionKind::Tracker] {
            metrics::set_connections_active(kind.as_str(), self.dispatcher.count(kind));
        }
    }
}

/// Interval whose first tick is one period from now.
fn ticker(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn required_lane(lane_id: Option<LaneId>) -> Result<LaneId, LaneError> {
    lane_id
        .filter(|id| !id.is_empty())
        .ok_or(LaneError::MissingField("laneId"))
}

fn required_venue(venue_id: Option<VenueId>) -> Result<VenueId, LaneError> {
    venue_id
        .filter(|id| !id.is_empty())
        .ok_or(LaneError::MissingField("venueId"))
}

fn required_device(device_id: Option<DeviceId>) -> Result<DeviceId, LaneError> {
    device_id
        .filter(|id| !id.is_empty())
        .ok_or(LaneError::MissingField("deviceId"))
}
