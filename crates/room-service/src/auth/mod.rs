//! Session binding for room members.

pub mod session_cookie;

pub use session_cookie::{cookie_value, SessionSigner, SESSION_COOKIE_NAME};
