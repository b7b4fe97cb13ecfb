//! Hit and transform relays.
//!
//! Both are stateless pass-throughs over the [`Dispatcher`]. Hits go to every
//! client connection in the venue, not just the lane group of `laneId`.
//! Calibration transforms are never stored; the projector owns its value.

use super::connection::ConnectionId;
use super::dispatcher::Dispatcher;
use crate::observability::metrics;

use common::types::LaneId;
use lane_protocol::{HitEvent, RawHit, ServerEvent};
use serde_json::Value;
use tracing::{debug, trace};

/// Canonicalise a validated tracker event and push it to all clients.
pub fn relay_hit(dispatcher: &Dispatcher, hit: RawHit, now_millis: i64) -> HitEvent {
    let hit = hit.canonicalize(now_millis);
    let delivered = dispatcher.broadcast_clients(&ServerEvent::Hit(hit.clone()), None);
    metrics::record_hit_relayed(hit.miss);
    trace!(
        target: "lane.relay",
        lane_id = %hit.lane_id,
        miss = hit.miss,
        recipients = delivered,
        "Hit relayed"
    );
    hit
}

/// Ask whichever projector owns `lane_id` for its current transform.
pub fn request_transform(dispatcher: &Dispatcher, lane_id: LaneId) -> usize {
    debug!(target: "lane.relay", lane_id = %lane_id, "Transform requested");
    dispatcher.broadcast_clients(&ServerEvent::GetCurrentTransform { lane_id }, None)
}

/// Relay a projector's transform answer to everyone but the projector.
pub fn current_transform(
    dispatcher: &Dispatcher,
    responder: ConnectionId,
    lane_id: LaneId,
    transform: Value,
) -> usize {
    debug!(target: "lane.relay", lane_id = %lane_id, "Current transform relayed");
    dispatcher.broadcast_clients(
        &ServerEvent::CurrentTransform { lane_id, transform },
        Some(responder),
    )
}

/// Push a new calibration transform to all clients.
pub fn update_transform(dispatcher: &Dispatcher, lane_id: LaneId, transform: Value) -> usize {
    debug!(target: "lane.relay", lane_id = %lane_id, "Transform update relayed");
    dispatcher.broadcast_clients(&ServerEvent::UpdateTransform { lane_id, transform }, None)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::actors::connection::{ConnectionHandle, ConnectionKind};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn add(dispatcher: &mut Dispatcher, kind: ConnectionKind) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let (handle, rx) = ConnectionHandle::new(kind, 8);
        let id = handle.id();
        dispatcher.add(handle);
        (id, rx)
    }

    fn raw_hit(event_type: &str, t: Option<f64>) -> RawHit {
        RawHit {
            event_type: event_type.to_string(),
            lane_id: LaneId::new("lane_1"),
            x: 0.5,
            y: 0.25,
            t,
            meta_miss: false,
        }
    }

    #[test]
    fn test_hit_reaches_every_client_but_not_trackers() {
        let mut dispatcher = Dispatcher::new();
        let (_a, mut a_rx) = add(&mut dispatcher, ConnectionKind::Client);
        let (_b, mut b_rx) = add(&mut dispatcher, ConnectionKind::Client);
        let (_t, mut t_rx) = add(&mut dispatcher, ConnectionKind::Tracker);

        let hit = relay_hit(&dispatcher, raw_hit("rawHit", Some(1000.0)), 5_000);

        let expected = ServerEvent::Hit(HitEvent {
            lane_id: LaneId::new("lane_1"),
            x: 0.5,
            y: 0.25,
            t: 1000.0,
            miss: false,
        });
        assert_eq!(ServerEvent::Hit(hit), expected);
        assert_eq!(a_rx.try_recv().unwrap(), expected);
        assert_eq!(b_rx.try_recv().unwrap(), expected);
        assert!(t_rx.try_recv().is_err());
    }

    #[test]
    fn test_hit_without_timestamp_uses_now() {
        let dispatcher = Dispatcher::new();
        let hit = relay_hit(&dispatcher, raw_hit("rawMiss", None), 5_000);
        assert_eq!(hit.t, 5_000.0);
        assert!(hit.miss);
    }

    #[test]
    fn test_current_transform_skips_responder() {
        let mut dispatcher = Dispatcher::new();
        let (projector, mut projector_rx) = add(&mut dispatcher, ConnectionKind::Client);
        let (_admin, mut admin_rx) = add(&mut dispatcher, ConnectionKind::Client);
        let transform = json!({"scale": 1.1, "rotate": 0});

        let delivered =
            current_transform(&dispatcher, projector, LaneId::new("lane_1"), transform.clone());

        assert_eq!(delivered, 1);
        assert!(projector_rx.try_recv().is_err());
        assert_eq!(
            admin_rx.try_recv().unwrap(),
            ServerEvent::CurrentTransform {
                lane_id: LaneId::new("lane_1"),
                transform,
            }
        );
    }

    #[test]
    fn test_request_and_update_reach_all_clients() {
        let mut dispatcher = Dispatcher::new();
        let (_a, mut a_rx) = add(&mut dispatcher, ConnectionKind::Client);
        let (_b, mut b_rx) = add(&mut dispatcher, ConnectionKind::Client);

        assert_eq!(request_transform(&dispatcher, LaneId::new("lane_2")), 2);
        assert_eq!(
            update_transform(&dispatcher, LaneId::new("lane_2"), json!({"x": 3})),
            2
        );

        for rx in [&mut a_rx, &mut b_rx] {
            assert_eq!(
                rx.try_recv().unwrap(),
                ServerEvent::GetCurrentTransform {
                    lane_id: LaneId::new("lane_2")
                }
            );
            assert_eq!(
                rx.try_recv().unwrap(),
                ServerEvent::UpdateTransform {
                    lane_id: LaneId::new("lane_2"),
                    transform: json!({"x": 3}),
                }
            );
        }
    }
}
