//! Realtime subscription over Server-Sent Events.
//!
//! Each connection gets its own subscription to the room's channel. The stream
//! ends after `chat.destroy`, which is either published by a destroy or
//! synthesized locally when the room's remaining lifetime runs out. Dropping
//! the connection drops the subscription; server shutdown ends the stream.

use crate::errors::RoomError;
use crate::middleware::RoomAuth;
use crate::routes::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Handler for GET /api/realtime.
///
/// Emits `chat.message` events carrying the full message and a final
/// `chat.destroy` event with `{"isDestroyed":true}`.
#[instrument(skip_all, name = "room.handlers.realtime", fields(room_id = %auth.room_id))]
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RoomAuth>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, RoomError> {
    let remaining = state.registry.remaining_lifetime(&auth.room_id).await?;
    let events = state.dispatcher.subscribe(&auth.room_id, remaining)?;

    tracing::debug!(
        target: "room.events",
        remaining_ms = remaining.as_millis() as u64,
        "Realtime subscriber connected"
    );

    let stream = events
        .take_until(state.shutdown.clone().cancelled_owned())
        .filter_map(|event| async move {
            match event.payload() {
                Ok(data) => Some(Ok(Event::default().event(event.name()).data(data))),
                Err(e) => {
                    tracing::error!(target: "room.events", error = %e, "Failed to encode event");
                    None
                }
            }
        });

    let keep_alive = KeepAlive::new().interval(Duration::from_secs(
        state.config.sse_keepalive_seconds,
    ));

    Ok(Sse::new(stream).keep_alive(keep_alive))
}
