//! Prometheus metrics setup and metric definitions

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    // Seconds. Identity calls are bounded well under a second, upstream
    // renders can take several.
    let buckets = [
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets(&buckets)?
        .install_recorder()?;
    Ok(handle)
}

/// Register descriptions and zero values so HELP/TYPE lines are present from
/// startup.
pub fn describe_metrics() {
    describe_counter!("hostgate_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "hostgate_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "hostgate_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    describe_counter!(
        "hostgate_route_decisions_total",
        "Routing decisions by area and decision kind"
    );
    describe_counter!(
        "hostgate_identity_requests_total",
        "Identity provider and profile lookups by operation and outcome"
    );
    describe_histogram!(
        "hostgate_identity_request_duration_seconds",
        "Identity lookup duration in seconds"
    );
    describe_counter!(
        "hostgate_tenant_cache_total",
        "Tenant descriptor cache lookups by outcome"
    );

    counter!("hostgate_route_decisions_total", "area" => "app", "decision" => "redirect")
        .absolute(0);
    counter!("hostgate_identity_requests_total", "operation" => "get_session", "outcome" => "ok")
        .absolute(0);
    counter!("hostgate_tenant_cache_total", "outcome" => "hit").absolute(0);
    gauge!("hostgate_http_requests_in_flight").set(0.0);
}
