//! Wire protocol for the lane server.
//!
//! Every frame is a JSON object tagged by its `type` field. Admin, user and
//! projector connections speak [`ClientRequest`] / [`ServerEvent`]; tracker
//! connections send raw hit objects that are validated into [`RawHit`] and
//! relayed as canonical [`HitEvent`]s.

#![warn(clippy::pedantic)]

pub mod codec;
pub mod hit;
pub mod lane;
pub mod messages;

pub use codec::{
    decode_event, decode_raw_hit, decode_request, encode_event, frame_text, CodecError,
};
pub use hit::{HitEvent, MalformedHit, RawHit};
pub use lane::{LaneState, PairedDevices, PairingCode};
pub use messages::{ClientRequest, ServerEvent, CONNECTED_MESSAGE};
