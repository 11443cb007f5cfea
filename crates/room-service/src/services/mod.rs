//! Core services.
//!
//! Each service owns one concern and talks to the store only through the
//! [`RoomStore`](crate::store::RoomStore) trait.

pub mod admission;
pub mod events;
pub mod ids;
pub mod messages;
pub mod rooms;

pub use admission::{Admission, AdmissionController};
pub use events::{BroadcastEventChannel, EventChannel, EventDispatcher, RoomEvent};
pub use messages::MessageLog;
pub use rooms::RoomRegistry;
