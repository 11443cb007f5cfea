//! Metrics definitions for Room Service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `room_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods actually routed
//! - `endpoint`: the fixed route table, everything else is `/other`
//! - `status`: success, error, timeout
//! - `outcome`: bounded by admission outcomes
//! - `event`: `chat.message`, `chat.destroy`
//!
//! Room ids never appear as label values.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("room_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `room_http_requests_total`, `room_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// `endpoint` must already be a label from [`endpoint_label`].
pub fn record_http_request(
    method: &str,
    endpoint: &'static str,
    status_code: u16,
    duration: Duration,
) {
    histogram!("room_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status" => categorize_status_code(status_code)
    )
    .record(duration.as_secs_f64());

    counter!("room_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto the fixed route table.
///
/// Room ids travel in the query string, which is never looked at here. The
/// one route with the id in its path, the admission gate, collapses to
/// `/room/{roomId}`; anything else unknown becomes `/other`.
pub fn endpoint_label(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/room" => "/api/room",
        "/api/room/create" => "/api/room/create",
        "/api/room/ttl" => "/api/room/ttl",
        "/api/messages" => "/api/messages",
        "/api/realtime" => "/api/realtime",
        _ => match path.strip_prefix("/room/") {
            Some(room_id) if !room_id.is_empty() && !room_id.contains('/') => "/room/{roomId}",
            _ => "/other",
        },
    }
}

// ============================================================================
// Room Lifecycle Metrics
// ============================================================================

/// Record a room creation.
///
/// Metric: `room_rooms_created_total`
pub fn record_room_created() {
    counter!("room_rooms_created_total").increment(1);
}

/// Record an explicit room destruction that removed state.
///
/// Metric: `room_rooms_destroyed_total`
pub fn record_room_destroyed() {
    counter!("room_rooms_destroyed_total").increment(1);
}

/// Record an admission attempt.
///
/// Metric: `room_admissions_total`
/// Labels: `outcome` (admitted, rejoined, full, not_found)
pub fn record_admission(outcome: &str) {
    counter!("room_admissions_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a message append.
///
/// Metric: `room_messages_appended_total`
pub fn record_message_appended() {
    counter!("room_messages_appended_total").increment(1);
}

/// Record a published realtime event.
///
/// Metric: `room_events_published_total`
/// Labels: `event`
pub fn record_event_published(event: &'static str) {
    counter!("room_events_published_total",
        "event" => event
    )
    .increment(1);
}

/// Record keys removed by the expiry reaper.
///
/// Metric: `room_expired_keys_purged_total`
pub fn record_keys_purged(count: usize) {
    counter!("room_expired_keys_purged_total").increment(count as u64);
}
