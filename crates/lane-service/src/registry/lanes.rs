//! Lane Registry.
//!
//! Owns the canonical [`LaneState`] of every lane plus a `code -> lane`
//! index kept in step with each lane's `pairing_code`. Callers never get a
//! mutable reference to a lane; mutations go through the methods below and
//! return a snapshot of the committed state.

use super::pairing_code::{generate_code, CodeSource};
use crate::errors::LaneError;

use common::clock::Clock;
use common::types::{DeviceClass, LaneId, VenueId};
use lane_protocol::{LaneState, PairingCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// In-memory lane table.
#[derive(Debug)]
pub struct LaneRegistry {
    lanes: HashMap<LaneId, LaneState>,
    /// Active code -> lane. Holds exactly the non-null codes of open lanes.
    code_index: HashMap<PairingCode, LaneId>,
    codes: Box<dyn CodeSource>,
    clock: Arc<dyn Clock>,
    default_game_mode: String,
}

impl LaneRegistry {
    #[must_use]
    pub fn new(
        codes: Box<dyn CodeSource>,
        clock: Arc<dyn Clock>,
        default_game_mode: impl Into<String>,
    ) -> Self {
        Self {
            lanes: HashMap::new(),
            code_index: HashMap::new(),
            codes,
            clock,
            default_game_mode: default_game_mode.into(),
        }
    }

    /// Return the lane, creating a fresh unpaired one if unknown.
    ///
    /// An existing lane keeps its original `venue_id`.
    pub fn get_or_create(&mut self, lane_id: &LaneId, venue_id: &VenueId) -> LaneState {
        if let Some(lane) = self.lanes.get(lane_id) {
            if lane.venue_id != *venue_id {
                debug!(
                    target: "lane.registry",
                    lane_id = %lane_id,
                    venue_id = %lane.venue_id,
                    requested_venue_id = %venue_id,
                    "Lane already belongs to another venue"
                );
            }
            return lane.clone();
        }

        let lane = LaneState::new(lane_id.clone(), venue_id.clone(), self.clock.now_millis());
        debug!(
            target: "lane.registry",
            lane_id = %lane_id,
            venue_id = %venue_id,
            "Lane created"
        );
        self.lanes.insert(lane_id.clone(), lane.clone());
        lane
    }

    /// Assign a fresh pairing code and (re)open the lane.
    ///
    /// The new code never equals the lane's previous code, nor any code
    /// currently held by another open lane.
    ///
    /// # Errors
    ///
    /// - [`LaneError::LaneNotFound`] if the lane is unknown.
    /// - [`LaneError::CodeSpaceExhausted`] if no unused code could be drawn.
    pub fn issue_pairing_code(&mut self, lane_id: &LaneId) -> Result<LaneState, LaneError> {
        let prior = self
            .lanes
            .get(lane_id)
            .ok_or_else(|| LaneError::LaneNotFound(lane_id.to_string()))?
            .pairing_code
            .clone();

        let index = &self.code_index;
        let code = generate_code(self.codes.as_mut(), prior.as_ref(), |candidate| {
            index.get(candidate).is_some_and(|owner| owner != lane_id)
        })?;

        if let Some(prior) = &prior {
            self.code_index.remove(prior);
        }
        self.code_index.insert(code.clone(), lane_id.clone());

        let now = self.clock.now_millis();
        let lane = self
            .lanes
            .get_mut(lane_id)
            .ok_or_else(|| LaneError::LaneNotFound(lane_id.to_string()))?;
        lane.pairing_code = Some(code);
        lane.closed = false;
        touch(lane, now);

        debug!(
            target: "lane.registry",
            lane_id = %lane_id,
            rotated = prior.is_some(),
            "Pairing code issued"
        );
        Ok(lane.clone())
    }

    /// Close the lane: drop its code, clear presence and session fields.
    ///
    /// Closing an already-closed lane changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`LaneError::LaneNotFound`] if the lane is unknown.
    pub fn close(&mut self, lane_id: &LaneId) -> Result<LaneState, LaneError> {
        let now = self.clock.now_millis();
        let lane = self
            .lanes
            .get_mut(lane_id)
            .ok_or_else(|| LaneError::LaneNotFound(lane_id.to_string()))?;

        let already_closed = lane.closed
            && lane.pairing_code.is_none()
            && !lane.paired_devices.user
            && !lane.paired_devices.projector
            && !lane.in_session
            && lane.game_mode.is_none();
        if already_closed {
            return Ok(lane.clone());
        }

        if let Some(code) = lane.pairing_code.take() {
            self.code_index.remove(&code);
        }
        lane.closed = true;
        lane.paired_devices = Default::default();
        lane.in_session = false;
        lane.game_mode = None;
        touch(lane, now);

        debug!(target: "lane.registry", lane_id = %lane_id, "Lane closed");
        Ok(lane.clone())
    }

    /// Mark the lane in session, using the default game mode when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`LaneError::LaneNotFound`] if the lane is unknown.
    pub fn start_session(
        &mut self,
        lane_id: &LaneId,
        game_mode: Option<String>,
    ) -> Result<LaneState, LaneError> {
        let now = self.clock.now_millis();
        let lane = self
            .lanes
            .get_mut(lane_id)
            .ok_or_else(|| LaneError::LaneNotFound(lane_id.to_string()))?;

        let game_mode = game_mode
            .filter(|mode| !mode.trim().is_empty())
            .unwrap_or_else(|| self.default_game_mode.clone());
        lane.in_session = true;
        lane.game_mode = Some(game_mode);
        touch(lane, now);
        Ok(lane.clone())
    }

    /// Set one of the two live-presence flags.
    ///
    /// # Errors
    ///
    /// Returns [`LaneError::LaneNotFound`] if the lane is unknown.
    pub fn set_device_paired(
        &mut self,
        lane_id: &LaneId,
        class: DeviceClass,
        present: bool,
    ) -> Result<LaneState, LaneError> {
        let now = self.clock.now_millis();
        let lane = self
            .lanes
            .get_mut(lane_id)
            .ok_or_else(|| LaneError::LaneNotFound(lane_id.to_string()))?;
        lane.paired_devices.set(class, present);
        touch(lane, now);
        Ok(lane.clone())
    }

    /// Record which page or game mode the lane's user tablet is showing.
    ///
    /// # Errors
    ///
    /// Returns [`LaneError::LaneNotFound`] if the lane is unknown.
    pub fn set_user_location(
        &mut self,
        lane_id: &LaneId,
        location: String,
    ) -> Result<LaneState, LaneError> {
        let now = self.clock.now_millis();
        let lane = self
            .lanes
            .get_mut(lane_id)
            .ok_or_else(|| LaneError::LaneNotFound(lane_id.to_string()))?;
        lane.user_location = Some(location);
        touch(lane, now);
        Ok(lane.clone())
    }

    #[must_use]
    pub fn find(&self, lane_id: &LaneId) -> Option<&LaneState> {
        self.lanes.get(lane_id)
    }

    /// Open lane whose live code is `code`.
    #[must_use]
    pub fn find_by_active_code(&self, code: &PairingCode) -> Option<&LaneState> {
        self.code_index
            .get(code)
            .and_then(|lane_id| self.lanes.get(lane_id))
            .filter(|lane| lane.accepts_code(code))
    }

    /// All lanes of a venue, ordered by lane id.
    #[must_use]
    pub fn lanes_for_venue(&self, venue_id: &VenueId) -> Vec<LaneState> {
        let mut lanes: Vec<LaneState> = self
            .lanes
            .values()
            .filter(|lane| lane.venue_id == *venue_id)
            .cloned()
            .collect();
        lanes.sort_by(|a, b| a.lane_id.cmp(&b.lane_id));
        lanes
    }

    /// Number of lanes currently holding a pairing code.
    #[must_use]
    pub fn open_lane_count(&self) -> usize {
        self.code_index.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

/// Bump `updated_at`, keeping it strictly increasing even if the clock stalls.
fn touch(lane: &mut LaneState, now_millis: i64) {
    lane.updated_at = now_millis.max(lane.updated_at.saturating_add(1));
}
