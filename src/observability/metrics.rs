//! Metrics collection.
//!
//! # Responsibilities
//! - Record per-request counters and latency
//! - Track routing misses, recovered panics and pool occupancy
//!
//! # Metrics
//! - `switchback_requests_total` (counter): requests by method and status
//! - `switchback_request_duration_seconds` (histogram): dispatch latency
//! - `switchback_unmatched_total` (counter): routing misses by method
//! - `switchback_handler_panics_total` (counter): panics caught in dispatch
//! - `switchback_context_pool_idle` (gauge): contexts parked in the pool
//!
//! # Design Decisions
//! - Everything goes through the `metrics` facade; the host decides on a
//!   recorder and exposition format
//! - Labels stay low-cardinality: method and status only, never paths

use std::time::Duration;

use http::{Method, StatusCode};
use metrics::{counter, gauge, histogram};

/// Record one completed request.
pub fn record_request(method: &Method, status: StatusCode, elapsed: Duration) {
    counter!(
        "switchback_requests_total",
        "method" => method.to_string(),
        "status" => status.as_u16().to_string(),
    )
    .increment(1);
    histogram!("switchback_request_duration_seconds").record(elapsed.as_secs_f64());
}

/// Record a request that matched no route.
pub fn record_unmatched(method: &Method) {
    counter!("switchback_unmatched_total", "method" => method.to_string()).increment(1);
}

/// Record a handler panic that dispatch recovered from.
pub fn record_panic() {
    counter!("switchback_handler_panics_total").increment(1);
}

/// Record the current idle size of the context pool.
pub fn record_pool_idle(idle: usize) {
    gauge!("switchback_context_pool_idle").set(idle as f64);
}
