//! Room Service Library
//!
//! Ephemeral, self-destructing chat rooms:
//!
//! - Rooms are created with a time-to-live and vanish when it elapses
//! - At most two participants are admitted per room, each bound by a
//!   single-use membership token carried in a signed cookie
//! - Messages live exactly as long as the room that holds them
//! - Message and destroy events fan out to connected clients over SSE
//!
//! # Architecture
//!
//! Handler -> Service -> Store, the same layering for every endpoint:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> store/*.rs
//!                       |
//!                       +-> middleware/auth.rs (membership guard)
//! ```
//!
//! # Key Design Decisions
//!
//! - **Passive expiry**: room lifetime is a property of the store keys. There is
//!   no sweeper when the store has native TTLs (Redis); the in-memory store runs
//!   a reaper task instead.
//! - **Atomic admission**: the capacity check and the token append are one store
//!   primitive (a Lua script on Redis), never a read followed by a write.
//! - **TTL reconciliation**: secondary keys are re-aligned to the metadata key's
//!   remaining TTL on every admission and message append. TTLs only shrink.
//! - **Best-effort fan-out**: events are refetch signals delivered at least once
//!   to current subscribers; there is no durable replay.
//!
//! # Modules
//!
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error taxonomy with HTTP status mapping
//! - [`store`] - Store adapter trait with Redis and in-memory backends
//! - [`services`] - Room registry, admission, message log, event dispatch
//! - [`auth`] - Session-binding cookie signing
//! - [`middleware`] - Membership guard and HTTP metrics
//! - [`handlers`] - HTTP handlers
//! - [`routes`] - Axum router and application state

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod store;
pub mod tasks;
