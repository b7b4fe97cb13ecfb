//! Lane Service Library
//!
//! Pairing and hit relay server for multi-lane throwing venues:
//!
//! - Admin consoles open lanes by issuing short pairing codes
//! - User tablets and projectors join a lane with its code, and silently
//!   rejoin from a time-boxed lock-in after a dropped connection
//! - Tracker hardware streams raw hit coordinates, relayed to every client
//! - Projectors exchange calibration transforms with admin consoles
//!
//! # Architecture
//!
//! ```text
//! axum /ws, /tracker ──> socket tasks ──mpsc──> GatewayActor
//!                              ^                   ├── LaneRegistry
//!                              │                   ├── LockInStore
//!                              └─── try_send ───── └── Dispatcher
//! ```
//!
//! All lane state lives in one actor task. There is no persistence; a
//! restart forgets every lane and lock-in.
//!
//! # Modules
//!
//! - [`actors`] - Gateway actor, dispatcher, relays
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with client-facing codes
//! - [`observability`] - Health endpoints and metrics
//! - [`registry`] - Lane registry, pairing codes, lock-ins
//! - [`transport`] - HTTP routes and WebSocket handling

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actors;
pub mod config;
pub mod errors;
pub mod observability;
pub mod registry;
pub mod transport;
