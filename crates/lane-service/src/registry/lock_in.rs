//! Device Lock-In Store.
//!
//! A lock-in remembers a device's last successful pairing for a fixed TTL so
//! it can rejoin silently after a dropped connection or page reload. The TTL
//! starts at pairing and is never refreshed.
//!
//! Expiry is checked lazily in [`LockInStore::validate`]; [`LockInStore::sweep`]
//! is housekeeping only. Whether the lane still honours the lock-in (exists,
//! open, same code) is a separate cross-check, [`check_against_lane`].

use crate::errors::RejoinFailure;

use chrono::{DateTime, Duration, Utc};
use common::clock::Clock;
use common::types::{DeviceId, LaneId, VenueId};
use lane_protocol::{LaneState, PairingCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One device's binding memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLockIn {
    pub device_id: DeviceId,
    pub lane_id: LaneId,
    pub venue_id: VenueId,
    /// Lane's pairing code at the time of lock-in.
    pub code: PairingCode,
    pub locked_until: DateTime<Utc>,
}

impl DeviceLockIn {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.locked_until
    }
}

/// TTL cache of lock-ins keyed by device.
#[derive(Debug)]
pub struct LockInStore {
    entries: HashMap<DeviceId, DeviceLockIn>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl LockInStore {
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    /// Insert or overwrite the device's lock-in, expiring one TTL from now.
    pub fn create(
        &mut self,
        device_id: DeviceId,
        lane_id: LaneId,
        venue_id: VenueId,
        code: PairingCode,
    ) -> DeviceLockIn {
        let locked_until = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let lock_in = DeviceLockIn {
            device_id: device_id.clone(),
            lane_id,
            venue_id,
            code,
            locked_until,
        };

        debug!(
            target: "lane.lock_in",
            device_id = %device_id,
            lane_id = %lock_in.lane_id,
            locked_until = %locked_until,
            "Lock-in created"
        );
        self.entries.insert(device_id, lock_in.clone());
        lock_in
    }

    /// The device's lock-in if present and not yet expired.
    ///
    /// # Errors
    ///
    /// [`RejoinFailure::NoLockIn`] or [`RejoinFailure::Expired`].
    pub fn validate(&self, device_id: &DeviceId) -> Result<&DeviceLockIn, RejoinFailure> {
        let lock_in = self
            .entries
            .get(device_id)
            .ok_or(RejoinFailure::NoLockIn)?;

        if lock_in.is_expired_at(self.clock.now()) {
            return Err(RejoinFailure::Expired);
        }
        Ok(lock_in)
    }

    pub fn remove(&mut self, device_id: &DeviceId) -> Option<DeviceLockIn> {
        self.entries.remove(device_id)
    }

    /// Drop every lock-in bound to `lane_id`. Returns how many were removed.
    pub fn remove_all_for_lane(&mut self, lane_id: &LaneId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, lock_in| lock_in.lane_id != *lane_id);
        let removed = before - self.entries.len();

        if removed > 0 {
            debug!(
                target: "lane.lock_in",
                lane_id = %lane_id,
                removed,
                "Lock-ins removed for lane"
            );
        }
        removed
    }

    /// Drop the lock-ins taken on `lane_id` while it held `code`. Called when
    /// the lane's code is regenerated. Returns how many were removed.
    pub fn remove_for_code(&mut self, lane_id: &LaneId, code: &PairingCode) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, lock_in| lock_in.lane_id != *lane_id || lock_in.code != *code);
        let removed = before - self.entries.len();

        if removed > 0 {
            debug!(
                target: "lane.lock_in",
                lane_id = %lane_id,
                code = %code,
                removed,
                "Lock-ins removed for rotated code"
            );
        }
        removed
    }

    /// Delete every expired entry. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, lock_in| !lock_in.is_expired_at(now));
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check that the lane still honours a lock-in.
///
/// # Errors
///
/// [`RejoinFailure::LaneMissing`], [`RejoinFailure::LaneClosed`] or
/// [`RejoinFailure::CodeRotated`].
pub fn check_against_lane(
    lock_in: &DeviceLockIn,
    lane: Option<&LaneState>,
) -> Result<(), RejoinFailure> {
    let lane = lane.ok_or(RejoinFailure::LaneMissing)?;
    if lane.closed {
        return Err(RejoinFailure::LaneClosed);
    }
    if lane.pairing_code.as_ref() != Some(&lock_in.code) {
        return Err(RejoinFailure::CodeRotated);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::clock::ManualClock;

    fn store() -> (LockInStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (LockInStore::new(Duration::minutes(60), clock.clone()), clock)
    }

    fn lock(store: &mut LockInStore, device: &str, lane: &str) -> DeviceLockIn {
        store.create(
            DeviceId::new(device),
            LaneId::new(lane),
            VenueId::new("venue_default"),
            PairingCode::new("K7X2"),
        )
    }

    #[test]
    fn test_create_sets_ttl_from_now() {
        let (mut store, clock) = store();
        let lock_in = lock(&mut store, "user_1", "lane_1");
        assert_eq!(lock_in.locked_until, clock.now() + Duration::minutes(60));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_validate_unknown_device() {
        let (store, _) = store();
        assert_eq!(
            store.validate(&DeviceId::new("ghost")).unwrap_err(),
            RejoinFailure::NoLockIn
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let (mut store, clock) = store();
        lock(&mut store, "user_1", "lane_1");
        let device = DeviceId::new("user_1");

        clock.advance(Duration::minutes(60) - Duration::milliseconds(1));
        assert!(store.validate(&device).is_ok());

        clock.advance(Duration::milliseconds(1));
        assert_eq!(store.validate(&device).unwrap_err(), RejoinFailure::Expired);

        clock.advance(Duration::milliseconds(1));
        assert_eq!(store.validate(&device).unwrap_err(), RejoinFailure::Expired);
    }

    #[test]
    fn test_create_overwrites_previous_lock_in() {
        let (mut store, clock) = store();
        lock(&mut store, "user_1", "lane_1");
        clock.advance(Duration::minutes(10));
        lock(&mut store, "user_1", "lane_2");

        let lock_in = store.validate(&DeviceId::new("user_1")).unwrap();
        assert_eq!(lock_in.lane_id, LaneId::new("lane_2"));
        assert_eq!(lock_in.locked_until, clock.now() + Duration::minutes(60));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_all_for_lane() {
        let (mut store, _) = store();
        lock(&mut store, "user_1", "lane_1");
        lock(&mut store, "proj_1", "lane_1");
        lock(&mut store, "user_2", "lane_2");

        assert_eq!(store.remove_all_for_lane(&LaneId::new("lane_1")), 2);
        assert_eq!(store.len(), 1);
        assert!(store.validate(&DeviceId::new("user_2")).is_ok());
        assert_eq!(store.remove_all_for_lane(&LaneId::new("lane_1")), 0);
    }

    #[test]
    fn test_remove_for_code_keeps_other_codes_and_lanes() {
        let (mut store, _) = store();
        lock(&mut store, "user_1", "lane_1");
        lock(&mut store, "user_2", "lane_2");
        store.create(
            DeviceId::new("proj_1"),
            LaneId::new("lane_1"),
            VenueId::new("venue_default"),
            PairingCode::new("M3P9"),
        );

        let removed = store.remove_for_code(&LaneId::new("lane_1"), &PairingCode::new("K7X2"));

        assert_eq!(removed, 1);
        assert_eq!(
            store.validate(&DeviceId::new("user_1")).unwrap_err(),
            RejoinFailure::NoLockIn
        );
        assert!(store.validate(&DeviceId::new("user_2")).is_ok());
        assert!(store.validate(&DeviceId::new("proj_1")).is_ok());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (mut store, clock) = store();
        lock(&mut store, "old", "lane_1");
        clock.advance(Duration::minutes(30));
        lock(&mut store, "new", "lane_1");
        clock.advance(Duration::minutes(30));

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.validate(&DeviceId::new("new")).is_ok());
    }

    #[test]
    fn test_check_against_lane() {
        let (mut store, _) = store();
        let lock_in = lock(&mut store, "user_1", "lane_1");

        let mut lane = LaneState::new(LaneId::new("lane_1"), VenueId::new("venue_default"), 0);
        lane.pairing_code = Some(PairingCode::new("K7X2"));
        assert!(check_against_lane(&lock_in, Some(&lane)).is_ok());

        assert_eq!(
            check_against_lane(&lock_in, None).unwrap_err(),
            RejoinFailure::LaneMissing
        );

        lane.pairing_code = Some(PairingCode::new("M4QP"));
        assert_eq!(
            check_against_lane(&lock_in, Some(&lane)).unwrap_err(),
            RejoinFailure::CodeRotated
        );

        lane.closed = true;
        lane.pairing_code = None;
        assert_eq!(
            check_against_lane(&lock_in, Some(&lane)).unwrap_err(),
            RejoinFailure::LaneClosed
        );
    }
}
