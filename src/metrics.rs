//! Prometheus Metrics Module
//!
//! Pre-registered metrics for the reconciliation loop and flip engine.

use lazy_static::lazy_static;
use prometheus::{
    opts, register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

use crate::orders::OrderGroups;

lazy_static! {
    // --- Cycle Metrics ---

    /// Reconciliation cycles by outcome ("completed", "failed", "skipped")
    pub static ref CYCLES_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!("orderwatch_cycles_total", "Reconciliation cycles run"),
        &["outcome"]
    ).expect("FATAL: Failed to register CYCLES_TOTAL metric - check for duplicate registration");

    /// Wall time of one reconciliation cycle in seconds
    pub static ref CYCLE_LATENCY: Histogram = register_histogram!(
        "orderwatch_cycle_latency_seconds",
        "Reconciliation cycle latency",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).expect("FATAL: Failed to register CYCLE_LATENCY metric - check for duplicate registration");

    /// Size of the current known-orders snapshot
    pub static ref KNOWN_ORDERS: IntGauge = register_int_gauge!(
        opts!("orderwatch_known_orders", "Orders in the last open-orders snapshot")
    ).expect("FATAL: Failed to register KNOWN_ORDERS metric - check for duplicate registration");

    // --- Classification Metrics ---

    /// Orders classified per group
    pub static ref ORDERS_CLASSIFIED: IntCounterVec = register_int_counter_vec!(
        opts!("orderwatch_orders_classified_total", "Orders classified per group"),
        &["group"]
    ).expect("FATAL: Failed to register ORDERS_CLASSIFIED metric - check for duplicate registration");

    /// Individual by-id lookups of missing orders
    pub static ref MISSING_FETCHES: IntCounter = register_int_counter!(
        opts!("orderwatch_missing_fetches_total", "By-id lookups of missing orders")
    ).expect("FATAL: Failed to register MISSING_FETCHES metric - check for duplicate registration");

    /// Missing batches left unresolved because they hit the cap
    pub static ref SKIPPED_RESOLUTIONS: IntCounter = register_int_counter!(
        opts!("orderwatch_skipped_resolutions_total", "Missing batches skipped at the fetch cap")
    ).expect("FATAL: Failed to register SKIPPED_RESOLUTIONS metric - check for duplicate registration");

    // --- Event / Flip Metrics ---

    /// Events published by kind ("settled", "changed")
    pub static ref EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!("orderwatch_events_total", "Events published"),
        &["kind"]
    ).expect("FATAL: Failed to register EVENTS_TOTAL metric - check for duplicate registration");

    /// Counter-orders placed (by side, status)
    pub static ref FLIPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!("orderwatch_flips_total", "Counter-orders placed"),
        &["side", "status"]
    ).expect("FATAL: Failed to register FLIPS_TOTAL metric - check for duplicate registration");
}

pub fn record_cycle(outcome: &str) {
    CYCLES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_cycle_latency(latency_secs: f64) {
    CYCLE_LATENCY.observe(latency_secs);
}

pub fn set_known_orders(count: usize) {
    KNOWN_ORDERS.set(i64::try_from(count).unwrap_or(i64::MAX));
}

/// Count every group of a finished cycle
pub fn record_groups(groups: &OrderGroups) {
    let counts = [
        ("new", groups.new_orders.len()),
        ("matched", groups.matched_orders.len()),
        ("missing", groups.missing_orders.len()),
        ("cancelled", groups.cancelled_orders.len()),
        ("settled", groups.settled_orders.len()),
        ("part_filled", groups.part_filled_orders.len()),
    ];
    for (group, count) in counts {
        ORDERS_CLASSIFIED
            .with_label_values(&[group])
            .inc_by(count as u64);
    }
}

pub fn record_missing_fetch() {
    MISSING_FETCHES.inc();
}

pub fn record_skipped_resolution() {
    SKIPPED_RESOLUTIONS.inc();
}

pub fn record_event(kind: &str) {
    EVENTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_flip(side: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    FLIPS_TOTAL.with_label_values(&[side, status]).inc();
}

/// Get metrics as text for /metrics endpoint
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode Prometheus metrics: {}", e);
        return String::new();
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Prometheus metrics buffer is not valid UTF-8: {}", e);
            String::new()
        }
    }
}
