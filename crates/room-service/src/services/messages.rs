//! Message log.
//!
//! Messages are stored with the sender's membership token and live exactly as
//! long as the room: every append re-aligns the log and session TTLs to the
//! metadata TTL in the same store round trip.

use crate::errors::RoomError;
use crate::models::{Message, SendMessageRequest};
use crate::observability::metrics;
use crate::services::ids;
use crate::services::rooms::now_millis;
use crate::store::{AppendOutcome, RoomStore};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Message log service.
#[derive(Clone)]
pub struct MessageLog {
    store: Arc<dyn RoomStore>,
}

impl MessageLog {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        Self { store }
    }

    /// Append a message from the holder of `token`.
    ///
    /// # Errors
    ///
    /// - `RoomError::Validation` if sender or text violate their constraints
    /// - `RoomError::RoomNotExist` if the room vanished before the append
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn append(
        &self,
        room_id: &str,
        request: SendMessageRequest,
        token: &str,
    ) -> Result<Message, RoomError> {
        request
            .validate()
            .map_err(|msg| RoomError::Validation(msg.to_string()))?;

        let message = Message {
            id: ids::generate_message_id(),
            sender: request.sender,
            text: request.text,
            timestamp: now_millis(),
            room_id: room_id.to_string(),
            token: Some(token.to_string()),
        };

        match self.store.append_message(room_id, &message).await? {
            AppendOutcome::Appended { reconciled_ttl } => {
                metrics::record_message_appended();
                debug!(
                    target: "room.messages",
                    message_id = %message.id,
                    reconciled_ttl_ms = reconciled_ttl.map(|ttl| ttl.as_millis() as u64),
                    "Message appended"
                );
                Ok(message)
            }
            AppendOutcome::RoomMissing => Err(RoomError::RoomNotExist(room_id.to_string())),
        }
    }

    /// All messages in append order, with peer tokens removed.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::RoomNotFound` if the room no longer exists.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn list(&self, room_id: &str, reader_token: &str) -> Result<Vec<Message>, RoomError> {
        if self.store.get_room(room_id).await?.is_none() {
            return Err(RoomError::RoomNotFound(room_id.to_string()));
        }

        let messages = self.store.list_messages(room_id).await?;
        Ok(messages
            .into_iter()
            .map(|message| message.redacted_for(reader_token))
            .collect())
    }
}
