//! Broadcast Dispatcher.
//!
//! Subscription table plus fan-out. A connection may watch any number of
//! venues (admin groups) and be bound to at most one lane (lane group).
//! Delivery is at-most-once: a full or closed outbound queue drops the event
//! for that connection only.

use super::connection::{Binding, ConnectionHandle, ConnectionId, ConnectionKind, DeliveryFailure};
use crate::observability::metrics;

use common::types::{DeviceClass, LaneId, VenueId};
use lane_protocol::{LaneState, ServerEvent};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug)]
struct Subscriber {
    handle: ConnectionHandle,
    watching: HashSet<VenueId>,
    binding: Option<Binding>,
}

/// Connection registry and fan-out, owned by the gateway actor.
#[derive(Debug, Default)]
pub struct Dispatcher {
    connections: HashMap<ConnectionId, Subscriber>,
    admin_groups: HashMap<VenueId, HashSet<ConnectionId>>,
    lane_groups: HashMap<LaneId, HashSet<ConnectionId>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handle: ConnectionHandle) {
        self.connections.insert(
            handle.id(),
            Subscriber {
                handle,
                watching: HashSet::new(),
                binding: None,
            },
        );
    }

    /// Forget a connection entirely, returning the binding it held.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Binding> {
        let subscriber = self.connections.remove(&id)?;
        for venue_id in &subscriber.watching {
            remove_member(&mut self.admin_groups, venue_id, id);
        }
        if let Some(binding) = &subscriber.binding {
            remove_member(&mut self.lane_groups, &binding.lane_id, id);
        }
        subscriber.binding
    }

    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    #[must_use]
    pub fn kind(&self, id: ConnectionId) -> Option<ConnectionKind> {
        self.connections.get(&id).map(|s| s.handle.kind())
    }

    /// Join the admin group for `venue_id`.
    pub fn watch_venue(&mut self, id: ConnectionId, venue_id: &VenueId) {
        let Some(subscriber) = self.connections.get_mut(&id) else {
            return;
        };
        subscriber.watching.insert(venue_id.clone());
        self.admin_groups
            .entry(venue_id.clone())
            .or_default()
            .insert(id);
    }

    /// Bind a connection to a lane, returning its previous binding.
    pub fn bind(&mut self, id: ConnectionId, binding: Binding) -> Option<Binding> {
        let previous = self.unbind(id);
        let Some(subscriber) = self.connections.get_mut(&id) else {
            return previous;
        };
        self.lane_groups
            .entry(binding.lane_id.clone())
            .or_default()
            .insert(id);
        subscriber.binding = Some(binding);
        previous
    }

    pub fn unbind(&mut self, id: ConnectionId) -> Option<Binding> {
        let binding = self.connections.get_mut(&id)?.binding.take()?;
        remove_member(&mut self.lane_groups, &binding.lane_id, id);
        Some(binding)
    }

    /// Unbind every connection bound to `lane_id`.
    pub fn unbind_lane(&mut self, lane_id: &LaneId) -> Vec<(ConnectionId, Binding)> {
        let members = self.lane_groups.remove(lane_id).unwrap_or_default();
        members
            .into_iter()
            .filter_map(|id| {
                let binding = self.connections.get_mut(&id)?.binding.take()?;
                Some((id, binding))
            })
            .collect()
    }

    #[must_use]
    pub fn binding(&self, id: ConnectionId) -> Option<&Binding> {
        self.connections.get(&id)?.binding.as_ref()
    }

    /// Connections of `class` currently bound to `lane_id`.
    #[must_use]
    pub fn bound_count(&self, lane_id: &LaneId, class: DeviceClass) -> usize {
        self.lane_groups.get(lane_id).map_or(0, |members| {
            members
                .iter()
                .filter_map(|id| self.binding(*id))
                .filter(|b| b.class == class)
                .count()
        })
    }

    #[must_use]
    pub fn count(&self, kind: ConnectionKind) -> usize {
        self.connections
            .values()
            .filter(|s| s.handle.kind() == kind)
            .count()
    }

    /// Send to one connection. Returns whether it was queued.
    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) -> bool {
        match self.connections.get(&id) {
            Some(subscriber) => deliver(&subscriber.handle, event),
            None => false,
        }
    }

    /// Push a lane's state to its lane group and its venue's admin group.
    ///
    /// A connection in both groups receives it once.
    pub fn broadcast_state(&self, state: &LaneState) -> usize {
        let lane_members = self.lane_groups.get(&state.lane_id).into_iter().flatten();
        let admin_members = self.admin_groups.get(&state.venue_id).into_iter().flatten();
        let recipients: HashSet<ConnectionId> = lane_members.chain(admin_members).copied().collect();

        let event = ServerEvent::LaneStateUpdate(state.clone());
        let delivered = self.fan_out(recipients.into_iter(), &event);
        debug!(
            target: "lane.dispatch",
            lane_id = %state.lane_id,
            recipients = delivered,
            "Lane state broadcast"
        );
        delivered
    }

    /// Push to every client (non-tracker) connection, optionally skipping one.
    pub fn broadcast_clients(&self, event: &ServerEvent, except: Option<ConnectionId>) -> usize {
        let recipients = self
            .connections
            .values()
            .filter(|s| s.handle.kind() == ConnectionKind::Client)
            .map(|s| s.handle.id())
            .filter(|id| Some(*id) != except);
        self.fan_out(recipients, event)
    }

    fn fan_out(&self, recipients: impl Iterator<Item = ConnectionId>, event: &ServerEvent) -> usize {
        recipients
            .filter_map(|id| self.connections.get(&id))
            .filter(|subscriber| deliver(&subscriber.handle, event.clone()))
            .count()
    }
}

fn remove_member<K>(groups: &mut HashMap<K, HashSet<ConnectionId>>, key: &K, id: ConnectionId)
where
    K: std::hash::Hash + Eq,
{
    if let Some(members) = groups.get_mut(key) {
        members.remove(&id);
        if members.is_empty() {
            groups.remove(key);
        }
    }
}

fn deliver(handle: &ConnectionHandle, event: ServerEvent) -> bool {
    let name = event.name();
    match handle.try_deliver(event) {
        Ok(()) => true,
        Err(failure) => {
            metrics::record_dispatch_dropped();
            match failure {
                DeliveryFailure::Full => warn!(
                    target: "lane.dispatch",
                    connection_id = %handle.id(),
                    event = name,
                    reason = failure.as_str(),
                    "Outbound event dropped"
                ),
                DeliveryFailure::Closed => debug!(
                    target: "lane.dispatch",
                    connection_id = %handle.id(),
                    event = name,
                    reason = failure.as_str(),
                    "Outbound event dropped"
                ),
            }
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::DeviceId;
    use tokio::sync::mpsc;

    fn client(dispatcher: &mut Dispatcher) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let (handle, rx) = ConnectionHandle::new(ConnectionKind::Client, 8);
        let id = handle.id();
        dispatcher.add(handle);
        (id, rx)
    }

    fn binding(lane: &str, class: DeviceClass) -> Binding {
        Binding {
            lane_id: LaneId::new(lane),
            venue_id: VenueId::new("venue_default"),
            device_id: DeviceId::new(format!("{lane}-{class}")),
            class,
        }
    }

    fn state(lane: &str) -> LaneState {
        LaneState::new(LaneId::new(lane), VenueId::new("venue_default"), 1)
    }

    #[test]
    fn test_state_reaches_lane_group_and_admins_only() {
        let mut dispatcher = Dispatcher::new();
        let (admin, mut admin_rx) = client(&mut dispatcher);
        let (bound, mut bound_rx) = client(&mut dispatcher);
        let (other, mut other_rx) = client(&mut dispatcher);

        dispatcher.watch_venue(admin, &VenueId::new("venue_default"));
        dispatcher.bind(bound, binding("lane_1", DeviceClass::User));
        dispatcher.bind(other, binding("lane_2", DeviceClass::User));

        assert_eq!(dispatcher.broadcast_state(&state("lane_1")), 2);
        assert!(matches!(
            admin_rx.try_recv().unwrap(),
            ServerEvent::LaneStateUpdate(_)
        ));
        assert!(matches!(
            bound_rx.try_recv().unwrap(),
            ServerEvent::LaneStateUpdate(_)
        ));
        assert!(other_rx.try_recv().is_err());
    }

    #[test]
    fn test_member_of_both_groups_receives_once() {
        let mut dispatcher = Dispatcher::new();
        let (id, mut rx) = client(&mut dispatcher);
        dispatcher.watch_venue(id, &VenueId::new("venue_default"));
        dispatcher.bind(id, binding("lane_1", DeviceClass::Projector));

        assert_eq!(dispatcher.broadcast_state(&state("lane_1")), 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rebind_moves_lane_group() {
        let mut dispatcher = Dispatcher::new();
        let (id, _rx) = client(&mut dispatcher);

        assert!(dispatcher
            .bind(id, binding("lane_1", DeviceClass::User))
            .is_none());
        let previous = dispatcher.bind(id, binding("lane_2", DeviceClass::User));

        assert_eq!(previous.unwrap().lane_id, LaneId::new("lane_1"));
        assert_eq!(dispatcher.bound_count(&LaneId::new("lane_1"), DeviceClass::User), 0);
        assert_eq!(dispatcher.bound_count(&LaneId::new("lane_2"), DeviceClass::User), 1);
    }

    #[test]
    fn test_unbind_lane_returns_bound_connections() {
        let mut dispatcher = Dispatcher::new();
        let (user, _u) = client(&mut dispatcher);
        let (proj, _p) = client(&mut dispatcher);
        let (elsewhere, _e) = client(&mut dispatcher);
        dispatcher.bind(user, binding("lane_1", DeviceClass::User));
        dispatcher.bind(proj, binding("lane_1", DeviceClass::Projector));
        dispatcher.bind(elsewhere, binding("lane_2", DeviceClass::User));

        let mut unbound: Vec<ConnectionId> = dispatcher
            .unbind_lane(&LaneId::new("lane_1"))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        unbound.sort_by_key(ToString::to_string);
        let mut expected = vec![user, proj];
        expected.sort_by_key(ToString::to_string);

        assert_eq!(unbound, expected);
        assert!(dispatcher.binding(user).is_none());
        assert!(dispatcher.binding(elsewhere).is_some());
    }

    #[test]
    fn test_broadcast_clients_skips_trackers_and_excluded() {
        let mut dispatcher = Dispatcher::new();
        let (a, mut a_rx) = client(&mut dispatcher);
        let (_b, mut b_rx) = client(&mut dispatcher);
        let (tracker, mut tracker_rx) = ConnectionHandle::new(ConnectionKind::Tracker, 8);
        dispatcher.add(tracker);

        let delivered = dispatcher.broadcast_clients(&ServerEvent::connected(), Some(a));
        assert_eq!(delivered, 1);
        assert!(a_rx.try_recv().is_err());
        assert!(b_rx.try_recv().is_ok());
        assert!(tracker_rx.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_does_not_block_others() {
        let mut dispatcher = Dispatcher::new();
        let (slow, _slow_rx) = ConnectionHandle::new(ConnectionKind::Client, 1);
        let slow_id = slow.id();
        dispatcher.add(slow);
        let (_fast, mut fast_rx) = client(&mut dispatcher);

        assert!(dispatcher.send_to(slow_id, ServerEvent::connected()));
        let delivered = dispatcher.broadcast_clients(&ServerEvent::connected(), None);

        assert_eq!(delivered, 1);
        assert!(fast_rx.try_recv().is_ok());
    }

    #[test]
    fn test_remove_cleans_groups() {
        let mut dispatcher = Dispatcher::new();
        let (id, _rx) = client(&mut dispatcher);
        dispatcher.watch_venue(id, &VenueId::new("venue_default"));
        dispatcher.bind(id, binding("lane_1", DeviceClass::User));

        let binding = dispatcher.remove(id).unwrap();
        assert_eq!(binding.lane_id, LaneId::new("lane_1"));
        assert!(!dispatcher.contains(id));
        assert_eq!(dispatcher.broadcast_state(&state("lane_1")), 0);
        assert_eq!(dispatcher.count(ConnectionKind::Client), 0);
    }
}
