//! Test utilities for the lane server.
//!
//! Provides an in-process server harness, a WebSocket test client and
//! request fixtures for integration tests.

pub mod fixtures;
pub mod server_harness;
pub mod ws_client;

pub use fixtures::*;
pub use server_harness::*;
pub use ws_client::*;
