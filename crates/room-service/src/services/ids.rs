//! Identifier generation.
//!
//! Room ids and membership tokens are drawn from the system CSPRNG and encoded
//! as unpadded base64url, so they are safe in paths, query strings and cookie
//! values without escaping.

use crate::errors::RoomError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};

/// Random bytes in a room id (128 bits).
const ROOM_ID_BYTES: usize = 16;

/// Random bytes in a membership token (192 bits).
const TOKEN_BYTES: usize = 24;

fn random_url_safe<const N: usize>() -> Result<String, RoomError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; N];

    rng.fill(&mut bytes).map_err(|_| {
        tracing::error!(target: "room.services.ids", "Failed to generate random bytes");
        RoomError::Internal
    })?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Generate a fresh, unguessable room id.
///
/// # Errors
///
/// Returns `RoomError::Internal` if the system RNG fails.
pub fn generate_room_id() -> Result<String, RoomError> {
    random_url_safe::<ROOM_ID_BYTES>()
}

/// Generate a fresh membership token.
///
/// # Errors
///
/// Returns `RoomError::Internal` if the system RNG fails.
pub fn generate_token() -> Result<String, RoomError> {
    random_url_safe::<TOKEN_BYTES>()
}

/// Generate a message id.
pub fn generate_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
