//! Redis store adapter.
//!
//! Room lifetime is carried entirely by Redis key expiry; nothing in this
//! process times rooms out. Admission and message append run as Lua scripts
//! (see [`lua_scripts`]) so their check-then-write sequences are atomic.
//!
//! # Connection Pattern
//!
//! The redis-rs `MultiplexedConnection` is cheap to clone and safe to use
//! concurrently. Each operation clones it; no locking is needed.

use super::{
    lua_scripts, messages_key, meta_key, session_key, AdmitOutcome, AppendOutcome, RoomKeyTtls,
    RoomStore,
};
use crate::errors::RoomError;
use crate::models::{Message, Room};
use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client, Pipeline, Script};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Hash field holding the membership list (JSON array).
const FIELD_CONNECTED: &str = "connected";

/// Hash field holding the creation timestamp.
const FIELD_CREATED_AT: &str = "createdAt";

/// Redis-backed [`RoomStore`].
///
/// Cheaply cloneable; clones share the multiplexed connection.
#[derive(Clone)]
pub struct RedisRoomStore {
    /// Multiplexed connection (cheaply cloneable, designed for concurrent use).
    connection: MultiplexedConnection,
    /// Precompiled Lua scripts.
    admit_script: Script,
    append_script: Script,
}

impl RedisRoomStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Store` if the client cannot be opened or connected.
    pub async fn connect(redis_url: &str) -> Result<Self, RoomError> {
        let client = Client::open(redis_url).map_err(|e| {
            // Note: Do NOT log redis_url as it may contain credentials
            error!(target: "room.store.redis", error = %e, "Failed to open Redis client");
            RoomError::Store(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "room.store.redis", error = %e, "Failed to connect to Redis");
                RoomError::Store(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            admit_script: Script::new(lua_scripts::ADMIT_MEMBER),
            append_script: Script::new(lua_scripts::APPEND_MESSAGE),
        })
    }

    async fn pttl(&self, key: &str) -> Result<Option<Duration>, RoomError> {
        let mut conn = self.connection.clone();
        let ttl_ms: i64 = conn.pttl(key).await.map_err(|e| {
            warn!(target: "room.store.redis", error = %e, "Failed to read key TTL");
            RoomError::Store(format!("Failed to read TTL: {e}"))
        })?;
        Ok(ttl_from_millis(ttl_ms))
    }
}

/// Interpret a PTTL reply: -2 (missing) and -1 (no expiry) both map to `None`.
fn ttl_from_millis(ttl_ms: i64) -> Option<Duration> {
    u64::try_from(ttl_ms).ok().map(Duration::from_millis)
}

/// Rebuild a [`Room`] from its hash fields.
fn room_from_fields(room_id: &str, fields: &HashMap<String, String>) -> Result<Room, RoomError> {
    let connected = match fields.get(FIELD_CONNECTED) {
        Some(raw) => serde_json::from_str(raw)?,
        None => Vec::new(),
    };
    let created_at = fields
        .get(FIELD_CREATED_AT)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0);

    Ok(Room {
        room_id: room_id.to_string(),
        connected,
        created_at,
    })
}

/// MULTI/EXEC pipeline writing a new room's metadata hash and its lifetime.
fn create_room_pipeline(key: &str, connected: &str, created_at: i64, ttl_ms: i64) -> Pipeline {
    let mut pipe = ::redis::pipe();
    pipe.atomic()
        .hset(key, FIELD_CONNECTED, connected)
        .ignore()
        .hset(key, FIELD_CREATED_AT, created_at)
        .ignore()
        .pexpire(key, ttl_ms)
        .ignore();
    pipe
}

#[async_trait::async_trait]
impl RoomStore for RedisRoomStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<(), RoomError> {
        let mut conn = self.connection.clone();
        let _: String = ::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| RoomError::Store(format!("Ping failed: {e}")))?;
        Ok(())
    }

    #[instrument(skip_all, fields(room_id = %room.room_id))]
    async fn create_room(&self, room: &Room, ttl: Duration) -> Result<(), RoomError> {
        let mut conn = self.connection.clone();
        let key = meta_key(&room.room_id);
        let connected = serde_json::to_string(&room.connected)?;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        let () = create_room_pipeline(&key, &connected, room.created_at, ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "room.store.redis", error = %e, "Failed to create room");
                RoomError::Store(format!("Failed to create room: {e}"))
            })?;

        debug!(target: "room.store.redis", ttl_ms = ttl_ms, "Created room metadata");
        Ok(())
    }

    #[instrument(skip_all, fields(room_id = %room_id))]
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, RoomError> {
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> =
            conn.hgetall(meta_key(room_id)).await.map_err(|e| {
                warn!(target: "room.store.redis", error = %e, "Failed to read room metadata");
                RoomError::Store(format!("Failed to read room metadata: {e}"))
            })?;

        // HGETALL on a missing key returns an empty map
        if fields.is_empty() {
            return Ok(None);
        }

        room_from_fields(room_id, &fields).map(Some)
    }

    #[instrument(skip_all, fields(room_id = %room_id))]
    async fn connected_tokens(&self, room_id: &str) -> Result<Option<Vec<String>>, RoomError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn
            .hget(meta_key(room_id), FIELD_CONNECTED)
            .await
            .map_err(|e| {
                warn!(target: "room.store.redis", error = %e, "Failed to read membership");
                RoomError::Store(format!("Failed to read membership: {e}"))
            })?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(room_id = %room_id))]
    async fn admit(
        &self,
        room_id: &str,
        existing_token: Option<&str>,
        candidate_token: &str,
        capacity: usize,
        admitted_at: i64,
    ) -> Result<AdmitOutcome, RoomError> {
        let mut conn = self.connection.clone();

        let result: i64 = self
            .admit_script
            .key(meta_key(room_id))
            .key(session_key(room_id))
            .arg(existing_token.unwrap_or(""))
            .arg(candidate_token)
            .arg(capacity)
            .arg(admitted_at)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "room.store.redis", error = %e, "Admission script failed");
                RoomError::Store(format!("Admission script failed: {e}"))
            })?;

        match result {
            lua_scripts::ADMIT_ROOM_MISSING => Ok(AdmitOutcome::RoomMissing),
            lua_scripts::ADMIT_ALREADY_MEMBER => Ok(AdmitOutcome::AlreadyMember),
            lua_scripts::ADMIT_FULL => Ok(AdmitOutcome::Full),
            lua_scripts::ADMIT_ADMITTED => Ok(AdmitOutcome::Admitted),
            other => {
                error!(
                    target: "room.store.redis",
                    result = other,
                    "Unexpected admission script result"
                );
                Err(RoomError::Store(format!(
                    "Unexpected admission script result: {other}"
                )))
            }
        }
    }

    #[instrument(skip_all, fields(room_id = %room_id))]
    async fn joined_at(&self, room_id: &str, token: &str) -> Result<Option<i64>, RoomError> {
        let mut conn = self.connection.clone();
        let raw: Option<i64> = conn.hget(session_key(room_id), token).await.map_err(|e| {
            warn!(target: "room.store.redis", error = %e, "Failed to read session binding");
            RoomError::Store(format!("Failed to read session binding: {e}"))
        })?;
        Ok(raw)
    }

    async fn remaining_ttl(&self, room_id: &str) -> Result<Option<Duration>, RoomError> {
        self.pttl(&meta_key(room_id)).await
    }

    async fn key_ttls(&self, room_id: &str) -> Result<RoomKeyTtls, RoomError> {
        Ok(RoomKeyTtls {
            meta: self.pttl(&meta_key(room_id)).await?,
            messages: self.pttl(&messages_key(room_id)).await?,
            session: self.pttl(&session_key(room_id)).await?,
        })
    }

    #[instrument(skip_all, fields(room_id = %room_id, message_id = %message.id))]
    async fn append_message(
        &self,
        room_id: &str,
        message: &Message,
    ) -> Result<AppendOutcome, RoomError> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(message)?;

        let result: i64 = self
            .append_script
            .key(meta_key(room_id))
            .key(messages_key(room_id))
            .key(session_key(room_id))
            .arg(&json)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "room.store.redis", error = %e, "Append script failed");
                RoomError::Store(format!("Append script failed: {e}"))
            })?;

        if result == lua_scripts::APPEND_ROOM_MISSING {
            return Ok(AppendOutcome::RoomMissing);
        }

        Ok(AppendOutcome::Appended {
            reconciled_ttl: ttl_from_millis(result),
        })
    }

    #[instrument(skip_all, fields(room_id = %room_id))]
    async fn list_messages(&self, room_id: &str) -> Result<Vec<Message>, RoomError> {
        let mut conn = self.connection.clone();
        let raw: Vec<String> = conn
            .lrange(messages_key(room_id), 0, -1)
            .await
            .map_err(|e| {
                warn!(target: "room.store.redis", error = %e, "Failed to read messages");
                RoomError::Store(format!("Failed to read messages: {e}"))
            })?;

        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(RoomError::from))
            .collect()
    }

    #[instrument(skip_all, fields(room_id = %room_id))]
    async fn delete_room(&self, room_id: &str) -> Result<u64, RoomError> {
        let mut conn = self.connection.clone();
        let keys = [
            session_key(room_id),
            meta_key(room_id),
            messages_key(room_id),
        ];

        let removed: u64 = conn.del(keys.as_slice()).await.map_err(|e| {
            warn!(target: "room.store.redis", error = %e, "Failed to delete room keys");
            RoomError::Store(format!("Failed to delete room: {e}"))
        })?;

        debug!(target: "room.store.redis", removed = removed, "Deleted room keys");
        Ok(removed)
    }
}
