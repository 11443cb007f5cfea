//! Data models for Room Service.
//!
//! Wire names are camelCase (`roomId`, `createdAt`) to match the browser client.

use serde::{Deserialize, Serialize};

/// Maximum number of participants admitted to a room.
pub const ROOM_CAPACITY: usize = 2;

/// Maximum sender display name length, in characters.
pub const MAX_SENDER_LENGTH: usize = 100;

/// Maximum message text length, in characters.
pub const MAX_TEXT_LENGTH: usize = 1000;

// ============================================================================
// Store Records
// ============================================================================

/// Room metadata as held by the store.
///
/// The remaining lifetime is an attribute of the store key, not of this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Opaque room identifier.
    pub room_id: String,

    /// Membership tokens in admission order (never more than [`ROOM_CAPACITY`]).
    pub connected: Vec<String>,

    /// Creation time (Unix milliseconds).
    pub created_at: i64,
}

impl Room {
    /// A freshly created room with no members.
    pub fn new(room_id: String, created_at: i64) -> Self {
        Self {
            room_id,
            connected: Vec::new(),
            created_at,
        }
    }

    /// Whether `token` is a current member.
    pub fn is_member(&self, token: &str) -> bool {
        self.connected.iter().any(|t| t == token)
    }
}

/// A chat message.
///
/// `token` identifies the sender's membership. It is always stored and always
/// carried by realtime events, but stripped from list responses unless the
/// reader owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub text: String,
    /// Server-assigned creation time (Unix milliseconds).
    pub timestamp: i64,
    pub room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Message {
    /// Remove the sender token unless it belongs to `reader_token`.
    #[must_use]
    pub fn redacted_for(mut self, reader_token: &str) -> Self {
        if self.token.as_deref() != Some(reader_token) {
            self.token = None;
        }
        self
    }
}

// ============================================================================
// Request/Response Models
// ============================================================================

/// Query string carrying the room a request targets.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomQuery {
    #[serde(rename = "roomId")]
    pub room_id: Option<String>,
}

/// Response for POST /api/room/create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: String,
}

/// Response for the admission gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub room_id: String,
    /// True when this request issued a new membership token.
    pub admitted: bool,
}

/// Response for GET /api/room/ttl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlResponse {
    /// Remaining lifetime in seconds, never negative.
    pub ttl: u64,
}

/// Response for GET /api/room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoResponse {
    pub room_id: String,
    pub created_at: i64,
    pub ttl: u64,
    pub participants: usize,
    pub capacity: usize,
    /// When the caller was admitted (Unix milliseconds), if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<i64>,
}

/// Request body for POST /api/messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub sender: String,
    pub text: String,
}

impl SendMessageRequest {
    /// Validate the request fields.
    ///
    /// Lengths are measured in characters, not bytes.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.sender.trim().is_empty() {
            return Err("Sender is required");
        }

        if self.sender.chars().count() > MAX_SENDER_LENGTH {
            return Err("Sender must be at most 100 characters");
        }

        if self.text.trim().is_empty() {
            return Err("Text is required");
        }

        if self.text.chars().count() > MAX_TEXT_LENGTH {
            return Err("Text must be at most 1000 characters");
        }

        Ok(())
    }
}

/// Response for GET /api/messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" when the store answers a ping.
    pub status: String,
    /// Store backend name.
    pub store: String,
}
