//! Request and payload fixtures.
//!
//! Identifiers default to the server's eagerly created lane so most tests
//! never have to spell them out.

use common::types::{DeviceClass, DeviceId, LaneId, VenueId};
use lane_protocol::ClientRequest;
use serde_json::{json, Value};

/// Venue of the default lane.
pub const VENUE: &str = "venue_default";

/// The default lane.
pub const LANE: &str = "lane_1";

pub fn watch_venue(venue: &str) -> ClientRequest {
    ClientRequest::WatchVenue {
        venue_id: Some(VenueId::new(venue)),
    }
}

pub fn create_code(venue: &str, lane: &str) -> ClientRequest {
    ClientRequest::CreatePairingCode {
        venue_id: Some(VenueId::new(venue)),
        lane_id: Some(LaneId::new(lane)),
    }
}

pub fn close_lane(lane: &str) -> ClientRequest {
    ClientRequest::CloseLane {
        venue_id: None,
        lane_id: Some(LaneId::new(lane)),
    }
}

pub fn start_lane(lane: &str, game_mode: Option<&str>) -> ClientRequest {
    ClientRequest::StartLane {
        venue_id: None,
        lane_id: Some(LaneId::new(lane)),
        game_mode: game_mode.map(str::to_string),
    }
}

pub fn join(code: &str, class: DeviceClass, device: &str) -> ClientRequest {
    ClientRequest::JoinWithCode {
        code: Some(code.to_string()),
        client_type: Some(class),
        device_id: Some(DeviceId::new(device)),
    }
}

pub fn auto_rejoin(device: &str, class: DeviceClass) -> ClientRequest {
    ClientRequest::AutoRejoin {
        device_id: Some(DeviceId::new(device)),
        client_type: Some(class),
    }
}

pub fn update_location(location: &str) -> ClientRequest {
    ClientRequest::UpdateLocation {
        location: Some(location.to_string()),
    }
}

/// Builder for tracker hit payloads.
///
/// ```rust,ignore
/// tracker.send_json(&TestHit::new(LANE, 0.5, 0.25).at(1000.0).build()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TestHit {
    lane: String,
    x: f64,
    y: f64,
    t: Option<f64>,
    miss: bool,
}

impl TestHit {
    pub fn new(lane: &str, x: f64, y: f64) -> Self {
        Self {
            lane: lane.to_string(),
            x,
            y,
            t: None,
            miss: false,
        }
    }

    /// Tracker-side timestamp in epoch milliseconds.
    pub fn at(mut self, t: f64) -> Self {
        self.t = Some(t);
        self
    }

    /// Send as `rawMiss` instead of `rawHit`.
    pub fn miss(mut self) -> Self {
        self.miss = true;
        self
    }

    pub fn build(&self) -> Value {
        let event_type = if self.miss { "rawMiss" } else { "rawHit" };
        let mut payload = json!({
            "type": event_type,
            "laneId": self.lane,
            "x": self.x,
            "y": self.y,
        });
        if let (Some(t), Some(map)) = (self.t, payload.as_object_mut()) {
            map.insert("t".to_string(), json!(t));
        }
        payload
    }
}
