//! Message handlers.

use crate::errors::RoomError;
use crate::middleware::RoomAuth;
use crate::models::{Message, MessagesResponse, SendMessageRequest};
use crate::routes::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/messages.
///
/// Stores the message, then publishes `chat.message` to realtime subscribers.
///
/// # Response
///
/// - 200 OK with the stored message
/// - 400 Bad Request for a malformed body or invalid fields
/// - 410 Gone if the room vanished after the membership check
#[instrument(skip_all, name = "room.handlers.send_message", fields(room_id = %auth.room_id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RoomAuth>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<Message>, RoomError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(target: "room.handlers.messages", error = %rejection, "Rejected message body");
        RoomError::Validation("Invalid message body".to_string())
    })?;

    let message = state
        .messages
        .append(&auth.room_id, request, &auth.token)
        .await?;

    state
        .dispatcher
        .publish_message(&auth.room_id, message.clone())
        .await?;

    Ok(Json(message))
}

/// Handler for GET /api/messages.
///
/// Messages come back in append order; only the caller's own messages keep
/// their `token`.
#[instrument(skip_all, name = "room.handlers.list_messages", fields(room_id = %auth.room_id))]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RoomAuth>,
) -> Result<Json<MessagesResponse>, RoomError> {
    let messages = state.messages.list(&auth.room_id, &auth.token).await?;
    Ok(Json(MessagesResponse { messages }))
}
