//! Lane state as seen by admins and bound clients.

use common::types::{DeviceClass, LaneId, VenueId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Short human-typed code that binds a device to a lane.
///
/// Codes are compared after [`PairingCode::normalize`], so a code typed in
/// lowercase or with stray whitespace still matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairingCode(String);

impl PairingCode {
    /// Wrap a code exactly as given (no normalisation).
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Trim and uppercase a code submitted by a client.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Live-connection presence of the two pairable device classes.
///
/// This reflects open sockets, not lock-ins: a device that dropped its
/// connection shows `false` here while its lock-in may still be valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedDevices {
    pub user: bool,
    pub projector: bool,
}

impl PairedDevices {
    #[must_use]
    pub const fn get(&self, class: DeviceClass) -> bool {
        match class {
            DeviceClass::User => self.user,
            DeviceClass::Projector => self.projector,
        }
    }

    pub fn set(&mut self, class: DeviceClass, present: bool) {
        match class {
            DeviceClass::User => self.user = present,
            DeviceClass::Projector => self.projector = present,
        }
    }
}

/// Canonical state of one lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneState {
    pub lane_id: LaneId,
    pub venue_id: VenueId,
    /// Non-null only while the lane is open for pairing.
    pub pairing_code: Option<PairingCode>,
    pub closed: bool,
    pub paired_devices: PairedDevices,
    pub in_session: bool,
    pub game_mode: Option<String>,
    /// Last page or game mode reported by the bound user tablet.
    #[serde(default)]
    pub user_location: Option<String>,
    /// Epoch milliseconds, strictly increasing per lane.
    pub updated_at: i64,
}

impl LaneState {
    /// Fresh, unpaired, not-closed lane.
    #[must_use]
    pub fn new(lane_id: LaneId, venue_id: VenueId, updated_at: i64) -> Self {
        Self {
            lane_id,
            venue_id,
            pairing_code: None,
            closed: false,
            paired_devices: PairedDevices::default(),
            in_session: false,
            game_mode: None,
            user_location: None,
            updated_at,
        }
    }

    /// Whether `code` is this lane's live pairing code.
    #[must_use]
    pub fn accepts_code(&self, code: &PairingCode) -> bool {
        !self.closed && self.pairing_code.as_ref() == Some(code)
    }
}
