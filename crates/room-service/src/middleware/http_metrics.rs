//! HTTP metrics middleware.
//!
//! Applied as the outermost layer so it sees every response, including
//! framework-level rejections that never reach a handler (unknown routes,
//! malformed JSON, timeouts).

use crate::observability::metrics::{endpoint_label, record_http_request};
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Records method, endpoint label, status and duration for every response.
///
/// The label is taken from the path alone before the request is handed on.
/// Room ids live in the `roomId` query parameter or, on the admission gate,
/// in a path segment that [`endpoint_label`] collapses, so no id ever
/// becomes a label value.
///
/// For SSE responses the duration covers the time until headers were sent,
/// not the lifetime of the stream.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let endpoint = endpoint_label(request.uri().path());
    let method = request.method().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    record_http_request(
        method.as_str(),
        endpoint,
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn handler_ok() -> &'static str {
        "OK"
    }

    async fn handler_conflict() -> (StatusCode, &'static str) {
        (StatusCode::CONFLICT, "full")
    }

    fn test_app() -> Router {
        Router::new()
            .route("/room/:room_id", get(handler_ok))
            .route("/full", get(handler_conflict))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    #[tokio::test]
    async fn test_middleware_passes_response_through() {
        let request = HttpRequest::builder()
            .uri("/room/abc")
            .body(Body::empty())
            .expect("request builder should succeed");

        let response = test_app()
            .oneshot(request)
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_preserves_error_status() {
        let request = HttpRequest::builder()
            .uri("/full")
            .body(Body::empty())
            .expect("request builder should succeed");

        let response = test_app()
            .oneshot(request)
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_middleware_sees_unrouted_requests() {
        let request = HttpRequest::builder()
            .uri("/nowhere")
            .body(Body::empty())
            .expect("request builder should succeed");

        let response = test_app()
            .oneshot(request)
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_room_id_in_path_is_not_a_label() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let request = HttpRequest::builder()
            .uri("/room/secret-room-id?roomId=also-secret")
            .body(Body::empty())
            .expect("request builder should succeed");
        test_app()
            .oneshot(request)
            .await
            .expect("request should succeed");

        let rendered = handle.render();
        assert!(rendered.contains(r#"endpoint="/room/{roomId}""#));
        assert!(!rendered.contains("secret"));
    }
}
