//! Prometheus metrics setup and metric definitions

use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    // Seconds; sub-millisecond buckets for cache hits
    let buckets = vec![
        0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus
/// output includes HELP/TYPE lines from startup.
pub fn describe_metrics() {
    // HTTP metrics
    describe_counter!(
        "bigbased_http_requests_total",
        "Total number of HTTP requests"
    );
    describe_histogram!(
        "bigbased_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "bigbased_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    // Tenancy
    describe_counter!(
        "bigbased_tenant_resolutions_total",
        "Tenant resolutions by the layer that answered (disabled/cache/store/fallback)"
    );
    describe_counter!(
        "bigbased_cache_operations_total",
        "Domain cache operations by tier, operation and result"
    );
    describe_gauge!(
        "bigbased_cache_memory_entries",
        "Entries held by the in-process cache after the last sweep"
    );
    describe_counter!(
        "bigbased_visit_events_total",
        "Visit analytics events by delivery result"
    );

    counter!("bigbased_tenant_resolutions_total", "source" => "cache").absolute(0);
    counter!("bigbased_visit_events_total", "result" => "delivered").absolute(0);
    gauge!("bigbased_http_requests_in_flight").set(0.0);
}
