//! JSON frame codec.
//!
//! WebSocket text frames carry one JSON object each. Binary frames are
//! accepted when their payload is UTF-8 JSON; see [`frame_text`].

use crate::hit::{MalformedHit, RawHit};
use crate::messages::{ClientRequest, ServerEvent};
use thiserror::Error;

/// Frame encode/decode failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame is not valid UTF-8")]
    NotUtf8,

    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed tracker event: {0}")]
    MalformedHit(#[from] MalformedHit),
}

/// View a binary frame as text.
///
/// # Errors
///
/// Returns [`CodecError::NotUtf8`] if the payload is not UTF-8.
pub fn frame_text(bytes: &[u8]) -> Result<&str, CodecError> {
    std::str::from_utf8(bytes).map_err(|_| CodecError::NotUtf8)
}

/// Decode a client request frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for invalid JSON or an unknown `type`.
pub fn decode_request(text: &str) -> Result<ClientRequest, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Decode and validate a tracker frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for invalid JSON and
/// [`CodecError::MalformedHit`] when required fields are missing.
pub fn decode_raw_hit(text: &str) -> Result<RawHit, CodecError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    Ok(RawHit::from_value(&value)?)
}

/// Encode a server event as a text frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode_event(event: &ServerEvent) -> Result<String, CodecError> {
    Ok(serde_json::to_string(event)?)
}

/// Decode a server event (used by clients and test harnesses).
///
/// # Errors
///
/// Returns [`CodecError::Json`] for invalid JSON or an unknown `type`.
pub fn decode_event(text: &str) -> Result<ServerEvent, CodecError> {
    Ok(serde_json::from_str(text)?)
}
