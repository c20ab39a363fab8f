//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Points fetched, uploaded, and marked per source
//! - Upload and fetch latency
//! - Connectivity retries against the remote store
//! - Engine state
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `uplink_` and follow Prometheus
//! conventions: counters end in `_total`, gauges represent current
//! state, histograms track distributions.
//!
//! # Usage
//!
//! ```rust,no_run
//! use uplink::metrics;
//! use std::time::Duration;
//!
//! // After a fetch pass over one source
//! metrics::record_points_fetched("room_sensors", 42);
//!
//! // After the remote write and local mark-write both land
//! metrics::record_batch_upload("room_sensors", 42, Duration::from_millis(180));
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record points fetched from the local store for one source.
pub fn record_points_fetched(source: &str, count: usize) {
    counter!("uplink_points_fetched_total", "source" => source.to_string())
        .increment(count as u64);
}

/// Record fetch latency for one source.
pub fn record_fetch_duration(source: &str, duration: Duration) {
    histogram!("uplink_fetch_duration_seconds", "source" => source.to_string())
        .record(duration.as_secs_f64());
}

/// Record a completed upload: remote write plus local mark-write.
pub fn record_batch_upload(source: &str, points: usize, duration: Duration) {
    let source = source.to_string();
    counter!("uplink_batches_uploaded_total", "source" => source.clone()).increment(1);
    counter!("uplink_points_uploaded_total", "source" => source.clone())
        .increment(points as u64);
    histogram!("uplink_upload_duration_seconds", "source" => source.clone())
        .record(duration.as_secs_f64());
    histogram!("uplink_batch_size", "source" => source).record(points as f64);
}

/// Record points marked as replicated in the local store.
pub fn record_points_marked(source: &str, count: usize) {
    counter!("uplink_points_marked_total", "source" => source.to_string())
        .increment(count as u64);
}

/// Record one connectivity probe that failed and will be retried.
pub fn record_connectivity_retry() {
    counter!("uplink_connectivity_retries_total").increment(1);
}

/// Record errors by pipeline stage.
pub fn record_error(stage: &str) {
    counter!("uplink_errors_total", "stage" => stage.to_string()).increment(1);
}

/// Gauge for engine state.
pub fn set_engine_state(state: &str) {
    // Encode state as numeric for alerting (2=running is the healthy value)
    let value = match state {
        "Created" => 0.0,
        "ConnectingLocal" => 1.0,
        "ConnectingRemote" => 1.5,
        "Running" => 2.0,
        "Stopped" => 3.0,
        "Failed" => 4.0,
        _ => -1.0,
    };
    gauge!("uplink_engine_state").set(value);
}
