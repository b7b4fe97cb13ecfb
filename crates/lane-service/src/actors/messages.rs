//! Message types for the gateway actor.
//!
//! Socket tasks talk to the gateway over `tokio::sync::mpsc`; request-reply
//! uses `tokio::sync::oneshot`.

use super::connection::{ConnectionHandle, ConnectionId};
use crate::errors::LaneError;

use common::types::LaneId;
use lane_protocol::{ClientRequest, LaneState, RawHit};
use tokio::sync::oneshot;

/// Messages sent to `GatewayActor`.
#[derive(Debug)]
pub enum GatewayMessage {
    /// A socket was accepted; start routing events to it.
    Register {
        connection: ConnectionHandle,
        respond_to: oneshot::Sender<()>,
    },

    /// A decoded request from a client socket.
    Request {
        connection_id: ConnectionId,
        request: ClientRequest,
        /// Errors have already been reported to the requesting socket.
        respond_to: oneshot::Sender<Result<(), LaneError>>,
    },

    /// A validated tracker frame. Fire-and-forget.
    RelayHit { connection_id: ConnectionId, hit: RawHit },

    /// The socket closed.
    Disconnect { connection_id: ConnectionId },

    /// Snapshot of gateway counters.
    GetStatus {
        respond_to: oneshot::Sender<GatewayStatus>,
    },

    /// Current state of one lane.
    GetLane {
        lane_id: LaneId,
        respond_to: oneshot::Sender<Option<LaneState>>,
    },
}

/// Gateway status returned by `GetStatus` and logged periodically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayStatus {
    pub clients: usize,
    pub trackers: usize,
    pub lanes: usize,
    /// Lanes currently holding a pairing code.
    pub open_lanes: usize,
    pub lock_ins: usize,
}
