//! Metrics definitions for the lane server.
//!
//! All metrics follow Prometheus naming conventions:
//! - `lane_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `kind`: 2 values (client, tracker)
//! - `outcome`: bounded by the outcome sets documented on each function

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return the handle that renders
/// `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Gauges
// ============================================================================

/// Metric: `lane_connections_active`
/// Labels: `kind` (client, tracker)
pub fn set_connections_active(kind: &'static str, count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("lane_connections_active", "kind" => kind).set(count as f64);
}

/// Metric: `lane_lanes_open`
///
/// Lanes currently holding a pairing code.
pub fn set_lanes_open(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("lane_lanes_open").set(count as f64);
}

/// Metric: `lane_gateway_mailbox_depth`
///
/// High values mean the gateway actor is falling behind.
pub fn set_gateway_mailbox_depth(depth: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("lane_gateway_mailbox_depth").set(depth as f64);
}

// ============================================================================
// Counters
// ============================================================================

/// Metric: `lane_hits_relayed_total`
/// Labels: `outcome` (hit, miss)
pub fn record_hit_relayed(miss: bool) {
    let outcome = if miss { "miss" } else { "hit" };
    counter!("lane_hits_relayed_total", "outcome" => outcome).increment(1);
}

/// Metric: `lane_tracker_events_dropped_total`
///
/// Malformed tracker frames. Never reported back to the tracker.
pub fn record_tracker_event_dropped() {
    counter!("lane_tracker_events_dropped_total").increment(1);
}

/// Metric: `lane_pairing_joins_total`
/// Labels: `outcome` (joined, continued, invalid_code, missing_field)
pub fn record_pairing_join(outcome: &'static str) {
    counter!("lane_pairing_joins_total", "outcome" => outcome).increment(1);
}

/// Metric: `lane_auto_rejoins_total`
/// Labels: `outcome` (success, no_lock_in, expired, lane_missing,
/// lane_closed, code_rotated, missing_field, error)
pub fn record_auto_rejoin(outcome: &'static str) {
    counter!("lane_auto_rejoins_total", "outcome" => outcome).increment(1);
}

/// Metric: `lane_lock_ins_swept_total`
pub fn record_lock_ins_swept(count: usize) {
    counter!("lane_lock_ins_swept_total").increment(u64::try_from(count).unwrap_or(u64::MAX));
}

/// Metric: `lane_dispatch_dropped_total`
///
/// Outbound events dropped because a connection's queue was full or closed.
pub fn record_dispatch_dropped() {
    counter!("lane_dispatch_dropped_total").increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use std::collections::HashSet;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        set_connections_active("client", 3);
        set_lanes_open(1);
        record_hit_relayed(false);
        record_dispatch_dropped();
    }

    #[test]
    fn test_metric_names_and_values() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            set_connections_active("client", 4);
            set_connections_active("tracker", 1);
            set_lanes_open(2);
            set_gateway_mailbox_depth(0);
            record_hit_relayed(false);
            record_hit_relayed(true);
            record_hit_relayed(true);
            record_tracker_event_dropped();
            record_pairing_join("joined");
            record_auto_rejoin("expired");
            record_lock_ins_swept(3);
            record_dispatch_dropped();
        });

        let snapshot = snapshotter.snapshot().into_vec();
        let names: HashSet<String> = snapshot
            .iter()
            .map(|(key, _, _, _)| key.key().name().to_string())
            .collect();

        for expected in [
            "lane_connections_active",
            "lane_lanes_open",
            "lane_gateway_mailbox_depth",
            "lane_hits_relayed_total",
            "lane_tracker_events_dropped_total",
            "lane_pairing_joins_total",
            "lane_auto_rejoins_total",
            "lane_lock_ins_swept_total",
            "lane_dispatch_dropped_total",
        ] {
            assert!(names.contains(expected), "missing metric {expected}");
        }

        let misses = snapshot.iter().find_map(|(key, _, _, value)| {
            let is_miss = key.key().name() == "lane_hits_relayed_total"
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == "outcome" && l.value() == "miss");
            match value {
                DebugValue::Counter(n) if is_miss => Some(*n),
                _ => None,
            }
        });
        assert_eq!(misses, Some(2));

        let swept = snapshot.iter().find_map(|(key, _, _, value)| {
            match value {
                DebugValue::Counter(n) if key.key().name() == "lane_lock_ins_swept_total" => {
                    Some(*n)
                }
                _ => None,
            }
        });
        assert_eq!(swept, Some(3));
    }
}
