// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for Provisionize.
//!
//! All metrics use the namespace prefix `provisionize_`.
//!
//! # Metrics Categories
//!
//! - **Request Metrics** - Provisioning/deprovisioning requests and their outcomes
//! - **Step Metrics** - Outcome of each backend adapter step
//! - **Event Metrics** - Status events relayed to callers
//!
//! # Example
//!
//! ```rust,no_run
//! use provisionize::metrics::record_request;
//! use provisionize::types::Operation;
//!
//! record_request(Operation::Provision, "completed", std::time::Duration::from_secs(90));
//! ```

use crate::types::Operation;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "provisionize";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Request Metrics
// ============================================================================

/// Total number of requests by operation and outcome
///
/// Labels:
/// - `operation`: `provision` or `deprovision`
/// - `outcome`: `completed`, `failed` or `cancelled`
pub static REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requests_total"),
        "Total number of requests by operation and outcome",
    );
    let counter = CounterVec::new(opts, &["operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of requests in seconds
///
/// Labels:
/// - `operation`: `provision` or `deprovision`
pub static REQUEST_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_request_duration_seconds"),
        "Duration of requests in seconds by operation",
    )
    .buckets(vec![0.1, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]);
    let histogram = HistogramVec::new(opts, &["operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Number of requests currently running
///
/// Labels:
/// - `operation`: `provision` or `deprovision`
pub static REQUESTS_IN_FLIGHT: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requests_in_flight"),
        "Number of requests currently running by operation",
    );
    let gauge = GaugeVec::new(opts, &["operation"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Step Metrics
// ============================================================================

/// Total number of adapter steps by service, operation and outcome
///
/// Labels:
/// - `service`: Adapter name (e.g., `oVirt`)
/// - `operation`: `provision` or `deprovision`
/// - `outcome`: `success` or `failure`
pub static SERVICE_STEPS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_service_steps_total"),
        "Total number of adapter steps by service, operation and outcome",
    );
    let counter = CounterVec::new(opts, &["service", "operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Event Metrics
// ============================================================================

/// Total number of status events relayed to callers
///
/// Labels:
/// - `service`: Adapter that emitted the event
/// - `failed`: `true` for failure-flagged events
pub static EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_events_total"),
        "Total number of status events relayed by service",
    );
    let counter = CounterVec::new(opts, &["service", "failed"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a finished request
///
/// # Arguments
/// * `operation` - Provision or deprovision
/// * `outcome` - `completed`, `failed` or `cancelled`
/// * `duration` - Time from start to the end of the event stream
pub fn record_request(operation: Operation, outcome: &str, duration: Duration) {
    REQUESTS_TOTAL
        .with_label_values(&[operation.as_str(), outcome])
        .inc();
    REQUEST_DURATION_SECONDS
        .with_label_values(&[operation.as_str()])
        .observe(duration.as_secs_f64());
}

/// Mark a request as started
pub fn record_request_started(operation: Operation) {
    REQUESTS_IN_FLIGHT
        .with_label_values(&[operation.as_str()])
        .inc();
}

/// Mark a request as finished
pub fn record_request_finished(operation: Operation) {
    REQUESTS_IN_FLIGHT
        .with_label_values(&[operation.as_str()])
        .dec();
}

/// Record the outcome of one adapter step
pub fn record_step(service: &str, operation: Operation, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    SERVICE_STEPS_TOTAL
        .with_label_values(&[service, operation.as_str(), outcome])
        .inc();
}

/// Record a relayed status event
pub fn record_event(service: &str, failed: bool) {
    let failed = if failed { "true" } else { "false" };
    EVENTS_TOTAL.with_label_values(&[service, failed]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
