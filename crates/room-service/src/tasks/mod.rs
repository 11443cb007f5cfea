//! Background tasks for Room Service.
//!
//! - `reaper` - Expiry sweep for the in-memory store and idle event channels

pub mod reaper;

pub use reaper::start_expiry_reaper;
