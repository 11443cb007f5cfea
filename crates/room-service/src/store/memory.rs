//! Process-local store adapter.
//!
//! Mirrors the Redis key layout with one map per key family. Each entry
//! carries an optional deadline; an entry past its deadline is treated as
//! absent on access and removed. [`MemoryRoomStore::purge_expired`] sweeps
//! entries nobody touches again (driven by the expiry reaper task).
//!
//! Deadlines use `tokio::time::Instant`, so tests can drive expiry with
//! `tokio::time::pause` / `advance`.
//!
//! Every operation holds the single inner lock for its whole duration, which
//! is what makes `admit` and `append_message` atomic here.

use super::{AdmitOutcome, AppendOutcome, RoomKeyTtls, RoomStore};
use crate::errors::RoomError;
use crate::models::{Message, Room};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A value with an optional expiry deadline.
#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Expiring<T> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// `meta:{id}`
    meta: HashMap<String, Expiring<Room>>,
    /// `messages:{id}`
    messages: HashMap<String, Expiring<Vec<Message>>>,
    /// `session:{id}` (token -> admitted-at millis)
    sessions: HashMap<String, Expiring<HashMap<String, i64>>>,
}

/// Return the live entry for `key`, evicting it first if it has expired.
fn live<'a, T>(
    map: &'a mut HashMap<String, Expiring<T>>,
    key: &str,
    now: Instant,
) -> Option<&'a mut Expiring<T>> {
    if map.get(key).is_some_and(|entry| entry.is_expired(now)) {
        map.remove(key);
    }
    map.get_mut(key)
}

/// Return the live entry for `key`, creating an empty one (no deadline) if absent.
fn live_or_insert<'a, T: Default>(
    map: &'a mut HashMap<String, Expiring<T>>,
    key: &str,
    now: Instant,
) -> &'a mut Expiring<T> {
    if map.get(key).is_some_and(|entry| entry.is_expired(now)) {
        map.remove(key);
    }
    map.entry(key.to_string()).or_insert_with(|| Expiring {
        value: T::default(),
        expires_at: None,
    })
}

/// Remove expired entries from one key family, returning how many went.
fn purge<T>(map: &mut HashMap<String, Expiring<T>>, now: Instant) -> usize {
    let before = map.len();
    map.retain(|_, entry| !entry.is_expired(now));
    before - map.len()
}

/// In-memory [`RoomStore`].
///
/// Cheaply cloneable; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoomStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRoomStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, RoomError> {
        self.inner
            .lock()
            .map_err(|_| RoomError::Store("Memory store lock poisoned".to_string()))
    }

    /// Drop every expired key. Returns the number of keys removed.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Store` if the lock is poisoned.
    pub fn purge_expired(&self) -> Result<usize, RoomError> {
        let mut inner = self.lock()?;
        let now = Instant::now();

        let removed = purge(&mut inner.meta, now)
            + purge(&mut inner.messages, now)
            + purge(&mut inner.sessions, now);

        if removed > 0 {
            debug!(target: "room.store.memory", removed = removed, "Purged expired keys");
        }
        Ok(removed)
    }

    /// Number of live rooms (metadata keys not yet expired).
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Store` if the lock is poisoned.
    pub fn room_count(&self) -> Result<usize, RoomError> {
        let inner = self.lock()?;
        let now = Instant::now();
        Ok(inner.meta.values().filter(|e| !e.is_expired(now)).count())
    }
}

#[async_trait::async_trait]
impl RoomStore for MemoryRoomStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), RoomError> {
        self.lock().map(|_| ())
    }

    async fn create_room(&self, room: &Room, ttl: Duration) -> Result<(), RoomError> {
        let mut inner = self.lock()?;
        inner.meta.insert(
            room.room_id.clone(),
            Expiring {
                value: room.clone(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, RoomError> {
        let mut inner = self.lock()?;
        let now = Instant::now();
        Ok(live(&mut inner.meta, room_id, now).map(|entry| entry.value.clone()))
    }

    async fn connected_tokens(&self, room_id: &str) -> Result<Option<Vec<String>>, RoomError> {
        let mut inner = self.lock()?;
        let now = Instant::now();
        Ok(live(&mut inner.meta, room_id, now).map(|entry| entry.value.connected.clone()))
    }

    async fn admit(
        &self,
        room_id: &str,
        existing_token: Option<&str>,
        candidate_token: &str,
        capacity: usize,
        admitted_at: i64,
    ) -> Result<AdmitOutcome, RoomError> {
        let mut inner = self.lock()?;
        let now = Instant::now();

        let Some(meta) = live(&mut inner.meta, room_id, now) else {
            return Ok(AdmitOutcome::RoomMissing);
        };

        if let Some(existing) = existing_token.filter(|t| !t.is_empty()) {
            if meta.value.is_member(existing) {
                return Ok(AdmitOutcome::AlreadyMember);
            }
        }

        if meta.value.connected.len() >= capacity {
            return Ok(AdmitOutcome::Full);
        }

        meta.value.connected.push(candidate_token.to_string());
        let deadline = meta.expires_at;

        let session = live_or_insert(&mut inner.sessions, room_id, now);
        session
            .value
            .insert(candidate_token.to_string(), admitted_at);
        if deadline.is_some() {
            session.expires_at = deadline;
        }

        Ok(AdmitOutcome::Admitted)
    }

    async fn joined_at(&self, room_id: &str, token: &str) -> Result<Option<i64>, RoomError> {
        let mut inner = self.lock()?;
        let now = Instant::now();
        Ok(live(&mut inner.sessions, room_id, now)
            .and_then(|entry| entry.value.get(token).copied()))
    }

    async fn remaining_ttl(&self, room_id: &str) -> Result<Option<Duration>, RoomError> {
        let mut inner = self.lock()?;
        let now = Instant::now();
        Ok(live(&mut inner.meta, room_id, now).and_then(|entry| entry.remaining(now)))
    }

    async fn key_ttls(&self, room_id: &str) -> Result<RoomKeyTtls, RoomError> {
        let mut inner = self.lock()?;
        let now = Instant::now();
        Ok(RoomKeyTtls {
            meta: live(&mut inner.meta, room_id, now).and_then(|e| e.remaining(now)),
            messages: live(&mut inner.messages, room_id, now).and_then(|e| e.remaining(now)),
            session: live(&mut inner.sessions, room_id, now).and_then(|e| e.remaining(now)),
        })
    }

    async fn append_message(
        &self,
        room_id: &str,
        message: &Message,
    ) -> Result<AppendOutcome, RoomError> {
        let mut inner = self.lock()?;
        let now = Instant::now();

        let Some(meta) = live(&mut inner.meta, room_id, now) else {
            return Ok(AppendOutcome::RoomMissing);
        };
        let deadline = meta.expires_at;

        let inner = &mut *inner;
        let log = live_or_insert(&mut inner.messages, room_id, now);
        log.value.push(message.clone());

        let Some(deadline) = deadline else {
            return Ok(AppendOutcome::Appended {
                reconciled_ttl: None,
            });
        };

        log.expires_at = Some(deadline);
        if let Some(session) = live(&mut inner.sessions, room_id, now) {
            session.expires_at = Some(deadline);
        }

        Ok(AppendOutcome::Appended {
            reconciled_ttl: Some(deadline.saturating_duration_since(now)),
        })
    }

    async fn list_messages(&self, room_id: &str) -> Result<Vec<Message>, RoomError> {
        let mut inner = self.lock()?;
        let now = Instant::now();
        Ok(live(&mut inner.messages, room_id, now)
            .map(|entry| entry.value.clone())
            .unwrap_or_default())
    }

    async fn delete_room(&self, room_id: &str) -> Result<u64, RoomError> {
        let mut inner = self.lock()?;
        let now = Instant::now();

        let mut removed = 0;
        if live(&mut inner.sessions, room_id, now).is_some() {
            inner.sessions.remove(room_id);
            removed += 1;
        }
        if live(&mut inner.meta, room_id, now).is_some() {
            inner.meta.remove(room_id);
            removed += 1;
        }
        if live(&mut inner.messages, room_id, now).is_some() {
            inner.messages.remove(room_id);
            removed += 1;
        }
        Ok(removed)
    }
}
