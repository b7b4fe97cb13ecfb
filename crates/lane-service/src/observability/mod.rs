//! Observability for the lane server.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `lane_connections_active` | Gauge | `kind` | Open client and tracker sockets |
//! | `lane_lanes_open` | Gauge | none | Lanes holding a pairing code |
//! | `lane_gateway_mailbox_depth` | Gauge | none | Gateway backpressure |
//! | `lane_hits_relayed_total` | Counter | `outcome` | Canonical hits pushed to clients |
//! | `lane_tracker_events_dropped_total` | Counter | none | Malformed tracker frames |
//! | `lane_pairing_joins_total` | Counter | `outcome` | Code joins |
//! | `lane_auto_rejoins_total` | Counter | `outcome` | Lock-in rejoins |
//! | `lane_lock_ins_swept_total` | Counter | none | Expired lock-ins removed |
//! | `lane_dispatch_dropped_total` | Counter | none | Outbound events dropped |

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
pub use metrics::init_metrics_recorder;
