//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder behind the `metrics` facade
//! - Define service metrics and their labels
//! - Hand out the handle `/metrics` renders from
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): latency by method, route
//! - `circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `dependency_up` (gauge): 1 once a startup dependency is ready
//! - `messages_published_total` (counter): publishes by subject, outcome
//!
//! # Design Decisions
//! - Route templates (`/users/{id}`) as labels, never raw paths
//! - Histogram buckets tuned for typical web latencies

use std::sync::OnceLock;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::resilience::BreakerState;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the process-wide recorder (first call) and return its handle.
///
/// Safe to call repeatedly; later calls return the same handle.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = match PrometheusBuilder::new().set_buckets_for_metric(
                Matcher::Full("http_request_duration_seconds".to_string()),
                LATENCY_BUCKETS,
            ) {
                Ok(builder) => builder,
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid latency buckets, using summaries");
                    PrometheusBuilder::new()
                }
            };

            let recorder = builder.build_recorder();
            let handle = recorder.handle();
            if metrics::set_global_recorder(recorder).is_err() {
                tracing::warn!(
                    "Global metrics recorder already installed - metrics may not be visible"
                );
            }
            handle
        })
        .clone()
}

/// Record a completed HTTP request.
pub fn record_request(method: &str, route: &str, status: u16, started: Instant) {
    let method = method.to_string();
    let route = route.to_string();
    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(started.elapsed().as_secs_f64());
}

/// Record a circuit breaker state change.
pub fn record_breaker_state(name: &str, state: BreakerState) {
    gauge!("circuit_breaker_state", "name" => name.to_string()).set(state.as_gauge());
}

/// Record whether a startup dependency is ready.
pub fn record_dependency_up(dependency: &'static str, up: bool) {
    gauge!("dependency_up", "dependency" => dependency).set(if up { 1.0 } else { 0.0 });
}

/// Record a publish attempt.
pub fn record_publish(subject: &str, outcome: &'static str) {
    counter!(
        "messages_published_total",
        "subject" => subject.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
