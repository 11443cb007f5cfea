//! Middleware for Room Service.
//!
//! # Components
//!
//! - `auth` - Membership guard for room-scoped routes
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{require_membership, AuthState, RoomAuth};
pub use http_metrics::http_metrics_middleware;
