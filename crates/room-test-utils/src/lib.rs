//! Test utilities for Room Service.
//!
//! - [`TestRoomServer`] - spawns the real router on a random local port over
//!   the in-memory store
//! - [`RecordingEventChannel`] - event channel that records every publish
//! - [`fixtures`] - configuration and session-cookie helpers

pub mod fixtures;
pub mod mock_events;
pub mod server_harness;

pub use mock_events::{PublishedEvent, RecordingEventChannel};
pub use server_harness::TestRoomServer;
