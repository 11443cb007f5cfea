//! HTTP request handlers for Room Service.

pub mod health;
pub mod messages;
pub mod metrics;
pub mod realtime;
pub mod rooms;

pub use health::health_check;
pub use messages::{list_messages, send_message};
pub use metrics::metrics_handler;
pub use realtime::subscribe;
pub use rooms::{create_room, destroy_room, enter_room, get_room_info, get_ttl};
