//! Observability for Room Service.
//!
//! Metrics definitions and recording helpers. Tracing is initialized in
//! `main.rs`; HTTP metrics are recorded by `middleware::http_metrics`.

pub mod metrics;
