//! Tracker hit events.
//!
//! Trackers send loosely-shaped JSON (`{type, laneId, x, y, t?, meta?}`).
//! [`RawHit::from_value`] checks the fields the relay depends on and
//! [`RawHit::canonicalize`] produces the event pushed to clients. Coordinates
//! are passed through untouched; scoring is a client concern.

use common::types::LaneId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Raw event type a tracker uses to report a miss.
pub const RAW_MISS_TYPE: &str = "rawMiss";

/// Why a tracker payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedHit {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing or falsy field: {0}")]
    MissingField(&'static str),

    #[error("field is not a number: {0}")]
    NotANumber(&'static str),
}

/// Validated tracker event, before canonicalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub event_type: String,
    pub lane_id: LaneId,
    pub x: f64,
    pub y: f64,
    /// Tracker timestamp in epoch milliseconds, if it sent a usable one.
    /// Sub-millisecond precision is kept.
    pub t: Option<f64>,
    /// `meta.miss` as reported by the tracker.
    pub meta_miss: bool,
}

impl RawHit {
    /// Validate a decoded tracker payload.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedHit`] when `type` or `laneId` is missing or falsy
    /// (`null`, `false`, `0`, `""`) or when `x`/`y` are absent or not numeric.
    pub fn from_value(value: &Value) -> Result<Self, MalformedHit> {
        let obj = value.as_object().ok_or(MalformedHit::NotAnObject)?;

        let event_type = truthy_text(obj.get("type")).ok_or(MalformedHit::MissingField("type"))?;
        let lane_id = truthy_text(obj.get("laneId")).ok_or(MalformedHit::MissingField("laneId"))?;
        let x = number(obj.get("x"), "x")?;
        let y = number(obj.get("y"), "y")?;

        // A zero or non-numeric timestamp counts as absent.
        let t = obj.get("t").and_then(Value::as_f64).filter(|t| *t != 0.0);

        let meta_miss = obj
            .get("meta")
            .and_then(|meta| meta.get("miss"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Self {
            event_type,
            lane_id: LaneId::new(lane_id),
            x,
            y,
            t,
            meta_miss,
        })
    }

    /// Whether the tracker classified this throw as a miss.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        self.event_type == RAW_MISS_TYPE || self.meta_miss
    }

    /// Build the client-facing event, stamping `now_millis` when the tracker
    /// sent no timestamp.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn canonicalize(self, now_millis: i64) -> HitEvent {
        let miss = self.is_miss();
        HitEvent {
            lane_id: self.lane_id,
            x: self.x,
            y: self.y,
            t: self.t.unwrap_or(now_millis as f64),
            miss,
        }
    }
}

/// Text of a truthy JSON value. Non-string scalars are stringified; `null`,
/// `false`, zero and the empty string yield `None`.
fn truthy_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

fn number(value: Option<&Value>, field: &'static str) -> Result<f64, MalformedHit> {
    match value {
        None | Some(Value::Null) => Err(MalformedHit::MissingField(field)),
        Some(v) => v.as_f64().ok_or(MalformedHit::NotANumber(field)),
    }
}

/// Canonical hit pushed to every client connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitEvent {
    pub lane_id: LaneId,
    pub x: f64,
    pub y: f64,
    /// Epoch milliseconds.
    pub t: f64,
    pub miss: bool,
}
