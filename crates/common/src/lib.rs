//! Common utilities and types shared across the lane server components.

#![warn(clippy::pedantic)]

/// Module for common data types (identifiers, client classes)
pub mod types;

/// Module for the wall-clock abstraction used by time-boxed state
pub mod clock;
