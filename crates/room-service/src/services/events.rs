//! Realtime event fan-out.
//!
//! Each active room has one `tokio::sync::broadcast` channel; each subscriber
//! connection holds one receiver wrapped as a stream. Delivery is best effort:
//! a subscriber that falls more than the buffer capacity behind skips the
//! events it missed instead of blocking publishers. A `chat.message` event is
//! a refetch signal, so a skipped one is recovered by the next list call.
//!
//! Channels are created on first subscribe and removed when the room is
//! destroyed or a publish finds no receivers left.

use crate::errors::RoomError;
use crate::models::Message;
use crate::observability::metrics;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, instrument, warn};

/// Event name for a new message.
pub const EVENT_MESSAGE: &str = "chat.message";

/// Event name for room destruction.
pub const EVENT_DESTROY: &str = "chat.destroy";

/// An event scoped to one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A message was appended. Carries the full message, token included.
    Message(Message),
    /// The room was destroyed or expired. Terminal.
    Destroy,
}

impl RoomEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::Message(_) => EVENT_MESSAGE,
            RoomEvent::Destroy => EVENT_DESTROY,
        }
    }

    /// JSON payload of the event.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized.
    pub fn payload(&self) -> Result<String, serde_json::Error> {
        match self {
            RoomEvent::Message(message) => serde_json::to_string(message),
            RoomEvent::Destroy => serde_json::to_string(&json!({ "isDestroyed": true })),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, RoomEvent::Destroy)
    }
}

/// Pub/sub channel scoped by room id.
#[async_trait::async_trait]
pub trait EventChannel: Send + Sync {
    /// Publish `event` to every current subscriber of `room_id`.
    ///
    /// Returns the number of subscribers the event was handed to.
    async fn publish(&self, room_id: &str, event: RoomEvent) -> Result<usize, RoomError>;

    /// Subscribe to `room_id`. The stream is lazy and ends when the channel
    /// is closed.
    fn subscribe(&self, room_id: &str) -> Result<BoxStream<'static, RoomEvent>, RoomError>;

    /// Drop channels with no remaining subscribers. Returns how many went.
    fn prune_idle(&self) -> usize {
        0
    }
}

/// Process-local [`EventChannel`] over `tokio::sync::broadcast`.
#[derive(Debug, Clone)]
pub struct BroadcastEventChannel {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<RoomEvent>>>>,
    capacity: usize,
}

impl BroadcastEventChannel {
    /// Create a channel set with `capacity` buffered events per room.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of rooms with an open channel.
    pub fn active_rooms(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop the room's channel if it is still the one `sender` belongs to.
    ///
    /// With `only_if_idle`, a channel that gained a subscriber since the
    /// caller looked is kept. Runs under the write lock, so no subscribe can
    /// attach between the check and the removal.
    fn remove_channel(
        &self,
        room_id: &str,
        sender: &broadcast::Sender<RoomEvent>,
        only_if_idle: bool,
    ) -> bool {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let current = match channels.get(room_id) {
            Some(current) if current.same_channel(sender) => current,
            _ => return false,
        };
        if only_if_idle && current.receiver_count() > 0 {
            return false;
        }

        channels.remove(room_id);
        true
    }
}

#[async_trait::async_trait]
impl EventChannel for BroadcastEventChannel {
    async fn publish(&self, room_id: &str, event: RoomEvent) -> Result<usize, RoomError> {
        let terminal = event.is_terminal();
        let sender = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(room_id)
            .cloned();

        let Some(sender) = sender else {
            return Ok(0);
        };

        let Ok(delivered) = sender.send(event) else {
            // Nobody was listening at send time; a subscriber may have
            // attached since, in which case the channel stays
            self.remove_channel(room_id, &sender, true);
            return Ok(0);
        };

        if terminal {
            // Dropping the last sender closes every subscriber stream
            self.remove_channel(room_id, &sender, false);
        }

        Ok(delivered)
    }

    fn subscribe(&self, room_id: &str) -> Result<BoxStream<'static, RoomEvent>, RoomError> {
        let receiver = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(room_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        let stream = BroadcastStream::new(receiver).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(target: "room.events", skipped = skipped, "Subscriber lagged, events dropped");
                    None
                }
            }
        });

        Ok(stream.boxed())
    }

    fn prune_idle(&self) -> usize {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }
}

/// End `events` at the first destroy event, or synthesize one when the room's
/// remaining lifetime elapses first.
pub fn bounded_by_room_lifetime(
    events: BoxStream<'static, RoomEvent>,
    remaining: Duration,
) -> BoxStream<'static, RoomEvent> {
    let deadline = Box::pin(tokio::time::sleep(remaining));

    stream::unfold(Some((events, deadline)), |state| async move {
        let (mut events, mut deadline) = state?;
        tokio::select! {
            next = events.next() => match next {
                Some(event) if event.is_terminal() => Some((event, None)),
                Some(event) => Some((event, Some((events, deadline)))),
                None => None,
            },
            () = &mut deadline => {
                debug!(target: "room.events", "Room lifetime elapsed, ending subscription");
                Some((RoomEvent::Destroy, None))
            }
        }
    })
    .boxed()
}

/// Publishes room events and hands out subscriptions.
#[derive(Clone)]
pub struct EventDispatcher {
    channel: Arc<dyn EventChannel>,
}

impl EventDispatcher {
    pub fn new(channel: Arc<dyn EventChannel>) -> Self {
        Self { channel }
    }

    /// Publish `chat.message` with the full message.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn publish_message(&self, room_id: &str, message: Message) -> Result<(), RoomError> {
        let delivered = self
            .channel
            .publish(room_id, RoomEvent::Message(message))
            .await?;
        metrics::record_event_published(EVENT_MESSAGE);
        debug!(target: "room.events", delivered = delivered, "Published message event");
        Ok(())
    }

    /// Publish `chat.destroy`.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn publish_destroy(&self, room_id: &str) -> Result<(), RoomError> {
        let delivered = self.channel.publish(room_id, RoomEvent::Destroy).await?;
        metrics::record_event_published(EVENT_DESTROY);
        debug!(target: "room.events", delivered = delivered, "Published destroy event");
        Ok(())
    }

    /// Subscribe to a room for at most `remaining`.
    pub fn subscribe(
        &self,
        room_id: &str,
        remaining: Duration,
    ) -> Result<BoxStream<'static, RoomEvent>, RoomError> {
        let events = self.channel.subscribe(room_id)?;
        Ok(bounded_by_room_lifetime(events, remaining))
    }
}
