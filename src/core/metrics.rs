// src/core/metrics.rs

//! Defines and registers Prometheus metrics for coordinator monitoring.
//!
//! Uses `lazy_static` to ensure metrics are registered only once globally for
//! the entire process lifetime.

use lazy_static::lazy_static;
use prometheus::{register_counter, register_gauge, Counter, Gauge, TextEncoder};

lazy_static! {
    /// The current round token.
    pub static ref CURRENT_TOKEN: Gauge =
        register_gauge!("beetle_coordinator_current_token", "Current invalidation round token.").unwrap();

    /// 0 = RUNNING, 1 = PAUSED.
    pub static ref COORDINATOR_PAUSED: Gauge =
        register_gauge!("beetle_coordinator_paused", "1 if the coordinator is in PAUSED state, else 0.").unwrap();

    /// The number of ids currently held in the bounded unknown-client set.
    pub static ref UNKNOWN_CLIENTS: Gauge =
        register_gauge!("beetle_coordinator_unknown_clients", "Number of distinct unknown client ids currently tracked.").unwrap();

    /// Total number of master switches completed since startup.
    pub static ref SWITCHES_TOTAL: Counter =
        register_counter!("beetle_coordinator_switches_total", "Total number of completed master switches.").unwrap();

    /// Total number of invalidation rounds that timed out without completing.
    pub static ref INVALIDATION_TIMEOUTS_TOTAL: Counter =
        register_counter!("beetle_coordinator_invalidation_timeouts_total", "Total number of invalidation rounds cancelled by timeout.").unwrap();

    /// Total number of bus publish failures.
    pub static ref PUBLISH_FAILURES_TOTAL: Counter =
        register_counter!("beetle_coordinator_publish_failures_total", "Total number of failed bus publishes.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap()
}
