//! Client and server message enums.
//!
//! Every frame is a JSON object tagged by `type`, using the event names the
//! venue front-ends already speak (`admin:pairCode:create`, `lane:closed`,
//! ...). Identifier fields on requests are optional so a missing field reaches
//! the gateway and is answered with the field name, instead of failing the
//! whole frame at parse time.

use crate::hit::HitEvent;
use crate::lane::{LaneState, PairingCode};
use common::types::{DeviceClass, DeviceId, LaneId, VenueId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Greeting pushed to every `/ws` connection on open.
pub const CONNECTED_MESSAGE: &str = "Connected to lane server";

/// Requests accepted on a client (`/ws`) connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Admin: subscribe to a venue and receive its lane snapshot.
    #[serde(rename = "admin:venue:watch", rename_all = "camelCase")]
    WatchVenue { venue_id: Option<VenueId> },

    /// Admin: open (or re-open) a lane with a fresh pairing code.
    #[serde(rename = "admin:pairCode:create", rename_all = "camelCase")]
    CreatePairingCode {
        venue_id: Option<VenueId>,
        lane_id: Option<LaneId>,
    },

    /// Admin: close a lane, dropping its code, bindings and lock-ins.
    #[serde(rename = "admin:lane:close", rename_all = "camelCase")]
    CloseLane {
        venue_id: Option<VenueId>,
        lane_id: Option<LaneId>,
    },

    /// Admin: mark a lane in session.
    #[serde(rename = "admin:lane:start", rename_all = "camelCase")]
    StartLane {
        venue_id: Option<VenueId>,
        lane_id: Option<LaneId>,
        #[serde(default)]
        game_mode: Option<String>,
    },

    /// User/projector: bind to the lane whose live code this is.
    #[serde(rename = "client:pairCode:join", rename_all = "camelCase")]
    JoinWithCode {
        code: Option<String>,
        client_type: Option<DeviceClass>,
        device_id: Option<DeviceId>,
    },

    /// User/projector: re-bind from a stored lock-in.
    #[serde(rename = "client:autoRejoin", rename_all = "camelCase")]
    AutoRejoin {
        device_id: Option<DeviceId>,
        client_type: Option<DeviceClass>,
    },

    /// Bound user: report the page or game mode it is showing.
    #[serde(rename = "client:location:update")]
    UpdateLocation { location: Option<String> },

    /// Ask the lane's projector for its current calibration transform.
    #[serde(rename = "getCurrentTargetTransform", rename_all = "camelCase")]
    GetCurrentTransform { lane_id: Option<LaneId> },

    /// Projector's answer to [`ClientRequest::GetCurrentTransform`].
    #[serde(rename = "currentTargetTransform", rename_all = "camelCase")]
    CurrentTransform {
        lane_id: Option<LaneId>,
        #[serde(default)]
        transform: Value,
    },

    /// Push a new calibration transform to the lane's projector.
    #[serde(rename = "updateTargetTransform", rename_all = "camelCase")]
    UpdateTransform {
        lane_id: Option<LaneId>,
        #[serde(default)]
        transform: Value,
    },
}

impl ClientRequest {
    /// Wire name of the request, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ClientRequest::WatchVenue { .. } => "admin:venue:watch",
            ClientRequest::CreatePairingCode { .. } => "admin:pairCode:create",
            ClientRequest::CloseLane { .. } => "admin:lane:close",
            ClientRequest::StartLane { .. } => "admin:lane:start",
            ClientRequest::JoinWithCode { .. } => "client:pairCode:join",
            ClientRequest::AutoRejoin { .. } => "client:autoRejoin",
            ClientRequest::UpdateLocation { .. } => "client:location:update",
            ClientRequest::GetCurrentTransform { .. } => "getCurrentTargetTransform",
            ClientRequest::CurrentTransform { .. } => "currentTargetTransform",
            ClientRequest::UpdateTransform { .. } => "updateTargetTransform",
        }
    }
}

/// Events pushed to client connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected { message: String },

    /// Snapshot answering `admin:venue:watch`.
    #[serde(rename = "admin:venue:lanes", rename_all = "camelCase")]
    VenueLanes {
        venue_id: VenueId,
        lanes: Vec<LaneState>,
    },

    /// Sent only to the admin connection that requested the code.
    #[serde(rename = "admin:pairCode:created", rename_all = "camelCase")]
    PairingCodeCreated {
        code: PairingCode,
        lane_id: LaneId,
        venue_id: VenueId,
    },

    #[serde(rename = "lane:state:update")]
    LaneStateUpdate(LaneState),

    #[serde(rename = "lane:closed", rename_all = "camelCase")]
    LaneClosed { venue_id: VenueId, lane_id: LaneId },

    #[serde(rename = "client:pairCode:joined", rename_all = "camelCase")]
    PairingJoined {
        ok: bool,
        venue_id: VenueId,
        lane_id: LaneId,
        state: LaneState,
    },

    #[serde(rename = "client:pairCode:error")]
    PairingError { message: String },

    #[serde(rename = "client:autoRejoin:success", rename_all = "camelCase")]
    AutoRejoinSuccess {
        venue_id: VenueId,
        lane_id: LaneId,
        state: LaneState,
    },

    #[serde(rename = "client:autoRejoin:failed")]
    AutoRejoinFailed { message: String },

    #[serde(rename = "hit")]
    Hit(HitEvent),

    #[serde(rename = "getCurrentTargetTransform", rename_all = "camelCase")]
    GetCurrentTransform { lane_id: LaneId },

    #[serde(rename = "currentTargetTransform", rename_all = "camelCase")]
    CurrentTransform { lane_id: LaneId, transform: Value },

    #[serde(rename = "updateTargetTransform", rename_all = "camelCase")]
    UpdateTransform { lane_id: LaneId, transform: Value },

    /// Request-level failure, returned only to the requester.
    #[serde(rename = "error")]
    Error { code: i32, message: String },
}

impl ServerEvent {
    /// The `connected` greeting.
    #[must_use]
    pub fn connected() -> Self {
        ServerEvent::Connected {
            message: CONNECTED_MESSAGE.to_string(),
        }
    }

    /// Wire name of the event, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::VenueLanes { .. } => "admin:venue:lanes",
            ServerEvent::PairingCodeCreated { .. } => "admin:pairCode:created",
            ServerEvent::LaneStateUpdate(_) => "lane:state:update",
            ServerEvent::LaneClosed { .. } => "lane:closed",
            ServerEvent::PairingJoined { .. } => "client:pairCode:joined",
            ServerEvent::PairingError { .. } => "client:pairCode:error",
            ServerEvent::AutoRejoinSuccess { .. } => "client:autoRejoin:success",
            ServerEvent::AutoRejoinFailed { .. } => "client:autoRejoin:failed",
            ServerEvent::Hit(_) => "hit",
            ServerEvent::GetCurrentTransform { .. } => "getCurrentTargetTransform",
            ServerEvent::CurrentTransform { .. } => "currentTargetTransform",
            ServerEvent::UpdateTransform { .. } => "updateTargetTransform",
            ServerEvent::Error { .. } => "error",
        }
    }
}
