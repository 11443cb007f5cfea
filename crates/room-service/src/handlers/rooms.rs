//! Room lifecycle handlers.
//!
//! - POST /api/room/create - create a room
//! - GET /room/:room_id - admission gate, issues the session cookie
//! - GET /api/room/ttl - remaining lifetime (members only)
//! - GET /api/room - room info (members only)
//! - DELETE /api/room - destroy the room (members only)

use crate::errors::RoomError;
use crate::middleware::RoomAuth;
use crate::models::{
    AdmissionResponse, CreateRoomResponse, RoomInfoResponse, TtlResponse, ROOM_CAPACITY,
};
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/room/create.
#[instrument(skip_all, name = "room.handlers.create")]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CreateRoomResponse>, RoomError> {
    let room = state.registry.create_room().await?;
    Ok(Json(CreateRoomResponse {
        room_id: room.room_id,
    }))
}

/// Handler for GET /room/:room_id.
///
/// Admits the caller, or recognizes them as an existing member when their
/// session cookie verifies and is still in the membership. A newly issued
/// token is returned only through `Set-Cookie`.
///
/// # Response
///
/// - 200 OK with `{ roomId, admitted }`
/// - 404 Not Found if the room is absent
/// - 409 Conflict if the room is full
#[instrument(skip_all, name = "room.handlers.enter", fields(room_id = %room_id))]
pub async fn enter_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, RoomError> {
    let existing = state.session.token_from_headers(&room_id, &headers);
    let admission = state.admission.admit(&room_id, existing.as_deref()).await?;

    let body = Json(AdmissionResponse {
        room_id: room_id.clone(),
        admitted: admission.is_new,
    });

    if !admission.is_new {
        return Ok(body.into_response());
    }

    let cookie = state.session.cookie(&room_id, &admission.token);
    Ok(([(header::SET_COOKIE, cookie.to_string())], body).into_response())
}

/// Handler for GET /api/room/ttl.
#[instrument(skip_all, name = "room.handlers.ttl", fields(room_id = %auth.room_id))]
pub async fn get_ttl(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RoomAuth>,
) -> Result<Json<TtlResponse>, RoomError> {
    let ttl = state.registry.remaining_ttl(&auth.room_id).await?;
    Ok(Json(TtlResponse { ttl }))
}

/// Handler for GET /api/room.
#[instrument(skip_all, name = "room.handlers.info", fields(room_id = %auth.room_id))]
pub async fn get_room_info(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RoomAuth>,
) -> Result<Json<RoomInfoResponse>, RoomError> {
    let room = state.registry.get_meta(&auth.room_id).await?;
    let ttl = state.registry.remaining_ttl(&auth.room_id).await?;
    let joined_at = state.store.joined_at(&auth.room_id, &auth.token).await?;

    Ok(Json(RoomInfoResponse {
        room_id: room.room_id,
        created_at: room.created_at,
        ttl,
        participants: room.connected.len(),
        capacity: ROOM_CAPACITY,
        joined_at,
    }))
}

/// Handler for DELETE /api/room.
///
/// Returns 204 whether or not this call was the one that removed the room.
#[instrument(skip_all, name = "room.handlers.destroy", fields(room_id = %auth.room_id))]
pub async fn destroy_room(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RoomAuth>,
) -> Result<StatusCode, RoomError> {
    state.registry.destroy_room(&auth.room_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
