//! Prometheus scrape endpoint.

use axum::extract::State;
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics.
///
/// Renders every recorded metric in Prometheus text format.
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
