//! Gateway mailbox monitoring.
//!
//! | Level | Depth |
//! |-------|-------|
//! | Normal | < 100 |
//! | Warning | 100-500 |
//! | Critical | > 500 |
//!
//! The monitor is shared between [`super::GatewayHandle`] (enqueue) and the
//! actor loop (dequeue). Depth is exported as `lane_gateway_mailbox_depth`.

use crate::observability::metrics;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, warn};

pub const GATEWAY_MAILBOX_NORMAL: usize = 100;
pub const GATEWAY_MAILBOX_WARNING: usize = 500;

/// Mailbox depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    Normal,
    Warning,
    Critical,
}

/// Tracks queue depth of the gateway mailbox.
#[derive(Debug, Default)]
pub struct MailboxMonitor {
    depth: AtomicUsize,
    peak_depth: AtomicUsize,
    messages_processed: AtomicU64,
}

impl MailboxMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message being added to the mailbox.
    pub fn record_enqueue(&self) {
        let new_depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;

        self.peak_depth.fetch_max(new_depth, Ordering::Relaxed);

        match level_for_depth(new_depth) {
            MailboxLevel::Critical => warn!(
                target: "lane.gateway.mailbox",
                depth = new_depth,
                threshold = GATEWAY_MAILBOX_WARNING,
                "Mailbox depth critical"
            ),
            MailboxLevel::Warning if new_depth == GATEWAY_MAILBOX_NORMAL => debug!(
                target: "lane.gateway.mailbox",
                depth = new_depth,
                "Mailbox depth elevated"
            ),
            _ => {}
        }
    }

    /// Record a message that was enqueued but never reached the actor.
    pub fn record_abandoned(&self) {
        self.decrement();
    }

    /// Record a message being taken off the mailbox by the actor.
    pub fn record_dequeue(&self) {
        let depth = self.decrement();
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        metrics::set_gateway_mailbox_depth(depth);
    }

    fn decrement(&self) -> usize {
        let previous = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| {
                Some(d.saturating_sub(1))
            })
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn current_level(&self) -> MailboxLevel {
        level_for_depth(self.current_depth())
    }

    /// Reset peak depth to the current depth.
    pub fn reset_peak(&self) {
        self.peak_depth
            .store(self.depth.load(Ordering::Relaxed), Ordering::Relaxed);
    }
}

fn level_for_depth(depth: usize) -> MailboxLevel {
    if depth > GATEWAY_MAILBOX_WARNING {
        MailboxLevel::Critical
    } else if depth >= GATEWAY_MAILBOX_NORMAL {
        MailboxLevel::Warning
    } else {
        MailboxLevel::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_dequeue_tracks_depth_and_peak() {
        let monitor = MailboxMonitor::new();

        monitor.record_enqueue();
        monitor.record_enqueue();
        monitor.record_enqueue();
        assert_eq!(monitor.current_depth(), 3);
        assert_eq!(monitor.peak_depth(), 3);

        monitor.record_dequeue();
        monitor.record_dequeue();
        assert_eq!(monitor.current_depth(), 1);
        assert_eq!(monitor.peak_depth(), 3);
        assert_eq!(monitor.messages_processed(), 2);
    }

    #[test]
    fn test_abandoned_message_is_not_counted_as_processed() {
        let monitor = MailboxMonitor::new();
        monitor.record_enqueue();
        monitor.record_abandoned();
        assert_eq!(monitor.current_depth(), 0);
        assert_eq!(monitor.messages_processed(), 0);
    }

    #[test]
    fn test_dequeue_on_empty_saturates() {
        let monitor = MailboxMonitor::new();
        monitor.record_dequeue();
        assert_eq!(monitor.current_depth(), 0);
    }

    #[test]
    fn test_levels() {
        assert_eq!(level_for_depth(0), MailboxLevel::Normal);
        assert_eq!(level_for_depth(99), MailboxLevel::Normal);
        assert_eq!(level_for_depth(100), MailboxLevel::Warning);
        assert_eq!(level_for_depth(500), MailboxLevel::Warning);
        assert_eq!(level_for_depth(501), MailboxLevel::Critical);
    }

    #[test]
    fn test_reset_peak() {
        let monitor = MailboxMonitor::new();
        for _ in 0..5 {
            monitor.record_enqueue();
        }
        for _ in 0..4 {
            monitor.record_dequeue();
        }
        assert_eq!(monitor.peak_depth(), 5);

        monitor.reset_peak();
        assert_eq!(monitor.peak_depth(), 1);
        assert_eq!(monitor.current_level(), MailboxLevel::Normal);
    }
}
