//! Lane server error types.
//!
//! Errors map to numeric codes carried in the `error` event. Internal details
//! are logged server-side but not exposed to clients.

use thiserror::Error;

/// Lane server error type.
///
/// Maps to `error` event codes:
/// - `MissingField`, `MalformedEvent`: `BAD_REQUEST` (1)
/// - `InvalidOrClosedCode`, `RejoinFailed`: `UNAUTHORIZED` (2)
/// - `LaneNotFound`: `NOT_FOUND` (4)
/// - `Internal`: `INTERNAL_ERROR` (6)
/// - `CodeSpaceExhausted`: `CAPACITY_EXCEEDED` (7)
#[derive(Debug, Error)]
pub enum LaneError {
    /// A required identifier was absent or blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Operation on a lane the registry has never seen.
    #[error("Lane not found: {0}")]
    LaneNotFound(String),

    /// Join attempted with a code no open lane currently holds.
    #[error("Invalid or closed pairing code")]
    InvalidOrClosedCode,

    /// Auto-rejoin could not re-establish a binding.
    #[error("Auto-rejoin failed: {0}")]
    RejoinFailed(RejoinFailure),

    /// Tracker payload missing required fields.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// No unused pairing code could be drawn.
    #[error("Pairing code space exhausted")]
    CodeSpaceExhausted,

    /// Internal error (actor gone, channel closed).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a stored lock-in could not be used for auto-rejoin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejoinFailure {
    /// No lock-in recorded for this device.
    #[error("No lock-in found")]
    NoLockIn,

    /// Lock-in TTL has passed.
    #[error("Lock-in expired")]
    Expired,

    /// Lock-in references a lane the registry no longer has.
    #[error("Lane no longer exists")]
    LaneMissing,

    /// Lane was closed after the lock-in was taken.
    #[error("Lane is closed")]
    LaneClosed,

    /// Lane's pairing code changed after the lock-in was taken.
    #[error("Pairing code has changed")]
    CodeRotated,
}

impl RejoinFailure {
    /// Label for the `outcome` metric dimension.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RejoinFailure::NoLockIn => "no_lock_in",
            RejoinFailure::Expired => "expired",
            RejoinFailure::LaneMissing => "lane_missing",
            RejoinFailure::LaneClosed => "lane_closed",
            RejoinFailure::CodeRotated => "code_rotated",
        }
    }
}

impl LaneError {
    /// Returns the `error` event code for this error.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        match self {
            LaneError::MissingField(_) | LaneError::MalformedEvent(_) => 1, // BAD_REQUEST
            LaneError::InvalidOrClosedCode | LaneError::RejoinFailed(_) => 2, // UNAUTHORIZED
            LaneError::LaneNotFound(_) => 4,                                 // NOT_FOUND
            LaneError::Internal(_) => 6,                                     // INTERNAL_ERROR
            LaneError::CodeSpaceExhausted => 7,                              // CAPACITY_EXCEEDED
        }
    }

    /// Returns a client-safe error message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            LaneError::MissingField(field) => format!("{field} is required"),
            LaneError::LaneNotFound(lane_id) => format!("Lane {lane_id} not found"),
            LaneError::InvalidOrClosedCode => "Invalid or closed pairing code".to_string(),
            LaneError::RejoinFailed(reason) => reason.to_string(),
            LaneError::MalformedEvent(_) => "Malformed message".to_string(),
            LaneError::CodeSpaceExhausted => {
                "No pairing codes available, please try again".to_string()
            }
            LaneError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl From<RejoinFailure> for LaneError {
    fn from(reason: RejoinFailure) -> Self {
        LaneError::RejoinFailed(reason)
    }
}
