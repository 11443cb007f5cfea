//! Store adapters for room state.
//!
//! The core only talks to the store through [`RoomStore`]. Two backends exist:
//!
//! - [`RedisRoomStore`] - production backend; native key TTLs, atomic
//!   primitives implemented as Lua scripts
//! - [`MemoryRoomStore`] - process-local backend for tests and single-node
//!   development; TTLs are deadlines checked on access and swept by a reaper
//!
//! # Key Patterns
//!
//! - `meta:{room_id}` - Room metadata (HASH: `connected` JSON array, `createdAt`)
//! - `messages:{room_id}` - Message log (LIST of JSON messages, append order)
//! - `session:{room_id}` - Session bindings (HASH: token -> admitted-at millis)
//!
//! All three keys share one lifetime. The metadata key's TTL is authoritative;
//! the other two are reconciled to it on every admission and append.

pub mod lua_scripts;
pub mod memory;
pub mod redis;

pub use self::memory::MemoryRoomStore;
pub use self::redis::RedisRoomStore;

use crate::errors::RoomError;
use crate::models::{Message, Room};
use std::time::Duration;

/// Metadata key for a room.
pub fn meta_key(room_id: &str) -> String {
    format!("meta:{room_id}")
}

/// Message log key for a room.
pub fn messages_key(room_id: &str) -> String {
    format!("messages:{room_id}")
}

/// Session-binding key for a room.
pub fn session_key(room_id: &str) -> String {
    format!("session:{room_id}")
}

/// Result of the atomic admission primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// Room metadata is absent.
    RoomMissing,
    /// The supplied existing token is already a member; nothing changed.
    AlreadyMember,
    /// Room is at capacity; nothing changed.
    Full,
    /// The candidate token was appended.
    Admitted,
}

/// Result of the message append primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Message stored; secondary keys now expire together with the metadata.
    Appended {
        /// Metadata TTL the secondary keys were reconciled to.
        reconciled_ttl: Option<Duration>,
    },
    /// Room metadata is absent; nothing was written.
    RoomMissing,
}

/// Remaining TTLs of the three keys of a room (`None` = key missing or no expiry).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomKeyTtls {
    pub meta: Option<Duration>,
    pub messages: Option<Duration>,
    pub session: Option<Duration>,
}

/// Store adapter consumed by the room core.
///
/// Implementations must make [`RoomStore::admit`] a single atomic conditional
/// update: the existence check, the membership/capacity check and the append
/// cannot interleave with another admission to the same room.
#[async_trait::async_trait]
pub trait RoomStore: Send + Sync {
    /// Human-readable backend name (for health output).
    fn backend(&self) -> &'static str;

    /// Verify the store is reachable.
    async fn ping(&self) -> Result<(), RoomError>;

    /// Write metadata for a new room and set its lifetime.
    async fn create_room(&self, room: &Room, ttl: Duration) -> Result<(), RoomError>;

    /// Read room metadata; `None` when the room never existed or expired.
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, RoomError>;

    /// Read only the membership list; `None` when the room is absent.
    async fn connected_tokens(&self, room_id: &str) -> Result<Option<Vec<String>>, RoomError>;

    /// Atomically admit a participant.
    ///
    /// If `existing_token` is a member, returns [`AdmitOutcome::AlreadyMember`]
    /// without a capacity check. Otherwise appends `candidate_token` when fewer
    /// than `capacity` members are present, recording `admitted_at` in the
    /// session key and aligning the session key's TTL with the metadata.
    async fn admit(
        &self,
        room_id: &str,
        existing_token: Option<&str>,
        candidate_token: &str,
        capacity: usize,
        admitted_at: i64,
    ) -> Result<AdmitOutcome, RoomError>;

    /// Admission time recorded for `token`, if any.
    async fn joined_at(&self, room_id: &str, token: &str) -> Result<Option<i64>, RoomError>;

    /// Remaining lifetime of the metadata key (`None` = missing or no expiry).
    async fn remaining_ttl(&self, room_id: &str) -> Result<Option<Duration>, RoomError>;

    /// Remaining lifetimes of all three room keys.
    async fn key_ttls(&self, room_id: &str) -> Result<RoomKeyTtls, RoomError>;

    /// Append a message, then reconcile the message-log and session TTLs to the
    /// metadata's remaining TTL. Fails closed when the metadata is absent.
    async fn append_message(
        &self,
        room_id: &str,
        message: &Message,
    ) -> Result<AppendOutcome, RoomError>;

    /// All messages in append order.
    async fn list_messages(&self, room_id: &str) -> Result<Vec<Message>, RoomError>;

    /// Delete all three room keys, returning how many existed.
    async fn delete_room(&self, room_id: &str) -> Result<u64, RoomError>;
}
