//! Actor model implementation for the lane server.
//!
//! ```text
//! GatewayActor (singleton)
//! ├── owns LaneRegistry, LockInStore
//! ├── owns Dispatcher (connection table, admin and lane groups)
//! └── fans out to N ConnectionHandles
//!     └── one per WebSocket, drained by that socket's writer task
//! ```
//!
//! Socket reader tasks never touch state directly; they send
//! [`GatewayMessage`]s and await replies over `oneshot` channels. Outbound
//! delivery is `try_send` only, so a stalled socket cannot hold up the gateway.
//!
//! # Modules
//!
//! - [`gateway`] - `GatewayActor` and its handle
//! - [`dispatcher`] - subscription table and fan-out
//! - [`relay`] - hit and calibration transform relays
//! - [`connection`] - per-socket handles and bindings
//! - [`messages`] - message types for the gateway mailbox
//! - [`metrics`] - mailbox depth monitoring

pub mod connection;
pub mod dispatcher;
pub mod gateway;
pub mod messages;
pub mod metrics;
pub mod relay;

pub use connection::{Binding, ConnectionHandle, ConnectionId, ConnectionKind};
pub use dispatcher::Dispatcher;
pub use gateway::{GatewayActor, GatewayHandle};
pub use messages::{GatewayMessage, GatewayStatus};
pub use metrics::MailboxMonitor;
