//! Room registry: create, inspect and destroy rooms.
//!
//! Expiry is passive. A room disappears when its metadata key's TTL elapses
//! in the store; nothing here times rooms out.

use crate::errors::RoomError;
use crate::models::Room;
use crate::observability::metrics;
use crate::services::events::EventDispatcher;
use crate::services::ids;
use crate::store::RoomStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Room registry service.
#[derive(Clone)]
pub struct RoomRegistry {
    store: Arc<dyn RoomStore>,
    dispatcher: EventDispatcher,
    room_ttl: Duration,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn RoomStore>, dispatcher: EventDispatcher, room_ttl: Duration) -> Self {
        Self {
            store,
            dispatcher,
            room_ttl,
        }
    }

    /// Create a room with no members and the configured lifetime.
    #[instrument(skip_all)]
    pub async fn create_room(&self) -> Result<Room, RoomError> {
        let room = Room::new(ids::generate_room_id()?, now_millis());
        self.store.create_room(&room, self.room_ttl).await?;

        metrics::record_room_created();
        info!(
            target: "room.registry",
            room_id = %room.room_id,
            ttl_seconds = self.room_ttl.as_secs(),
            "Room created"
        );
        Ok(room)
    }

    /// Read room metadata.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::RoomNotFound` when the room is absent.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn get_meta(&self, room_id: &str) -> Result<Room, RoomError> {
        self.store
            .get_room(room_id)
            .await?
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))
    }

    /// Remaining lifetime in whole seconds; 0 when missing or non-positive.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn remaining_ttl(&self, room_id: &str) -> Result<u64, RoomError> {
        Ok(self.remaining_lifetime(room_id).await?.as_secs())
    }

    /// Remaining lifetime at full precision; zero when missing.
    pub async fn remaining_lifetime(&self, room_id: &str) -> Result<Duration, RoomError> {
        Ok(self
            .store
            .remaining_ttl(room_id)
            .await?
            .unwrap_or(Duration::ZERO))
    }

    /// Delete every key of the room and broadcast `chat.destroy`.
    ///
    /// Idempotent: destroying a room that is already gone deletes nothing and
    /// publishes nothing. Returns whether this call removed the room.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn destroy_room(&self, room_id: &str) -> Result<bool, RoomError> {
        let removed = self.store.delete_room(room_id).await?;
        if removed == 0 {
            return Ok(false);
        }

        self.dispatcher.publish_destroy(room_id).await?;
        metrics::record_room_destroyed();
        info!(target: "room.registry", removed_keys = removed, "Room destroyed");
        Ok(true)
    }
}

/// Current wall-clock time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
