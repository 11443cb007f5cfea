//! Room Service error types.
//!
//! Every failure the core can produce maps to a distinct HTTP status and a
//! machine-readable code, so callers can tell "room gone" from "room full"
//! from "not a member". Store and internal details are logged server-side and
//! never returned to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Room Service error type.
///
/// Maps to HTTP status codes:
/// - RoomNotFound: 404 Not Found
/// - RoomFull: 409 Conflict
/// - Unauthorized: 401 Unauthorized
/// - Validation: 400 Bad Request
/// - RoomNotExist: 410 Gone
/// - Store, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum RoomError {
    /// Store operation failed (connectivity, script, serialization).
    #[error("Store error: {0}")]
    Store(String),

    /// Room metadata key is absent: never created or already expired.
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Room already holds two members and the caller is not one of them.
    #[error("Room is full: {0}")]
    RoomFull(String),

    /// Missing or invalid session credential, or token not a current member.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request input violated a shape or length constraint.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Room vanished between admission and a message append.
    #[error("Room does not exist: {0}")]
    RoomNotExist(String),

    /// Internal error.
    #[error("Internal error")]
    Internal,
}

impl RoomError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            RoomError::Store(_) | RoomError::Internal => 500,
            RoomError::RoomNotFound(_) => 404,
            RoomError::RoomFull(_) => 409,
            RoomError::Unauthorized(_) => 401,
            RoomError::Validation(_) => 400,
            RoomError::RoomNotExist(_) => 410,
        }
    }

    /// Machine-readable error code returned to clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            RoomError::Store(_) => "STORE_ERROR",
            RoomError::Internal => "INTERNAL_ERROR",
            RoomError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            RoomError::RoomFull(_) => "ROOM_FULL",
            RoomError::Unauthorized(_) => "UNAUTHORIZED",
            RoomError::Validation(_) => "VALIDATION_ERROR",
            RoomError::RoomNotExist(_) => "ROOM_NOT_EXIST",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let message = match &self {
            RoomError::Store(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "room.store", error = %err, "Store operation failed");
                "An internal storage error occurred".to_string()
            }
            RoomError::Internal => "An internal error occurred".to_string(),
            RoomError::RoomNotFound(_) => "Room not found or has expired".to_string(),
            RoomError::RoomFull(_) => "Room is full".to_string(),
            RoomError::Unauthorized(_) => "Unauthorized".to_string(),
            RoomError::Validation(reason) => reason.clone(),
            RoomError::RoomNotExist(_) => "Room no longer exists".to_string(),
        };

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Convert serde_json errors to RoomError
impl From<serde_json::Error> for RoomError {
    fn from(err: serde_json::Error) -> Self {
        RoomError::Store(format!("serialization failed: {err}"))
    }
}
