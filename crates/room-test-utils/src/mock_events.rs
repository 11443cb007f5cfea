//! Recording event channel.
//!
//! Wraps the real broadcast channel, so subscribers still receive events, and
//! additionally keeps a log of every publish for assertions such as "the
//! destroy event went out exactly once".

use futures::stream::BoxStream;
use room_service::errors::RoomError;
use room_service::services::{BroadcastEventChannel, EventChannel, RoomEvent};
use std::sync::Mutex;

/// One recorded publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedEvent {
    pub room_id: String,
    pub event: RoomEvent,
}

/// [`EventChannel`] that records publishes.
#[derive(Debug)]
pub struct RecordingEventChannel {
    inner: BroadcastEventChannel,
    published: Mutex<Vec<PublishedEvent>>,
}

impl Default for RecordingEventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingEventChannel {
    /// Create a recording channel with a 64-event buffer per room.
    pub fn new() -> Self {
        Self {
            inner: BroadcastEventChannel::new(64),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Every publish so far, in order.
    pub fn published(&self) -> Vec<PublishedEvent> {
        self.published.lock().unwrap().clone()
    }

    /// Number of publishes of `event_name` for `room_id`.
    pub fn count(&self, room_id: &str, event_name: &str) -> usize {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.room_id == room_id && p.event.name() == event_name)
            .count()
    }

    /// Number of `chat.destroy` publishes for `room_id`.
    pub fn destroy_count(&self, room_id: &str) -> usize {
        self.count(room_id, room_service::services::events::EVENT_DESTROY)
    }

    /// Number of `chat.message` publishes for `room_id`.
    pub fn message_count(&self, room_id: &str) -> usize {
        self.count(room_id, room_service::services::events::EVENT_MESSAGE)
    }
}

#[async_trait::async_trait]
impl EventChannel for RecordingEventChannel {
    async fn publish(&self, room_id: &str, event: RoomEvent) -> Result<usize, RoomError> {
        self.published.lock().unwrap().push(PublishedEvent {
            room_id: room_id.to_string(),
            event: event.clone(),
        });
        self.inner.publish(room_id, event).await
    }

    fn subscribe(&self, room_id: &str) -> Result<BoxStream<'static, RoomEvent>, RoomError> {
        self.inner.subscribe(room_id)
    }

    fn prune_idle(&self) -> usize {
        self.inner.prune_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_records_and_forwards() {
        let channel = RecordingEventChannel::new();
        let mut events = channel.subscribe("r").unwrap();

        channel.publish("r", RoomEvent::Destroy).await.unwrap();
        channel.publish("other", RoomEvent::Destroy).await.unwrap();

        assert_eq!(events.next().await, Some(RoomEvent::Destroy));
        assert_eq!(channel.destroy_count("r"), 1);
        assert_eq!(channel.message_count("r"), 0);
        assert_eq!(channel.published().len(), 2);
    }
}
