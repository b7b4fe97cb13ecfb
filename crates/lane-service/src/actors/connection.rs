//! Per-socket connection handles.
//!
//! Each live WebSocket gets a [`ConnectionHandle`] owned by the gateway and a
//! matching outbound receiver owned by the socket's writer task. The gateway
//! only ever calls [`ConnectionHandle::try_deliver`], so a slow or dead
//! socket can never stall the actor.

use common::types::{DeviceClass, DeviceId, LaneId, VenueId};
use lane_protocol::ServerEvent;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque identifier of one live socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which endpoint the socket was opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    /// `/ws`: admin, user or projector.
    Client,
    /// `/tracker`: one-way raw hit feed.
    Tracker,
}

impl ConnectionKind {
    /// Returns the kind as a string for log fields and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Client => "client",
            ConnectionKind::Tracker => "tracker",
        }
    }
}

/// A connection's binding to a lane, established by join or auto-rejoin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub lane_id: LaneId,
    pub venue_id: VenueId,
    pub device_id: DeviceId,
    pub class: DeviceClass,
}

/// Why an outbound event was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// Outbound queue is at capacity.
    Full,
    /// Writer task has gone away.
    Closed,
}

impl DeliveryFailure {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeliveryFailure::Full => "full",
            DeliveryFailure::Closed => "closed",
        }
    }
}

/// Gateway-side handle to one socket.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    kind: ConnectionKind,
    sender: mpsc::Sender<ServerEvent>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver its writer task drains.
    #[must_use]
    pub fn new(kind: ConnectionKind, buffer: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            kind,
            sender,
        };
        (handle, receiver)
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    /// Queue an event without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryFailure`] when the queue is full or the writer is gone.
    pub fn try_deliver(&self, event: ServerEvent) -> Result<(), DeliveryFailure> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryFailure::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryFailure::Closed,
        })
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
