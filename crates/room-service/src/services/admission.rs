//! Admission controller.
//!
//! Decides whether a caller may enter a room and issues the membership token.
//! The existence check, the membership check, the capacity check and the
//! token append run as one store primitive ([`RoomStore::admit`]), so two
//! concurrent joiners can never both take the last seat.

use crate::errors::RoomError;
use crate::models::ROOM_CAPACITY;
use crate::observability::metrics;
use crate::services::ids;
use crate::services::rooms::now_millis;
use crate::store::{AdmitOutcome, RoomStore};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of a successful admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// The caller's membership token.
    pub token: String,
    /// True when `token` was issued by this call.
    pub is_new: bool,
}

/// Admission controller service.
#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<dyn RoomStore>,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        Self { store }
    }

    /// Admit a caller to `room_id`.
    ///
    /// A caller presenting a token that is already a member gets it back
    /// unchanged, without a capacity check. Otherwise a fresh token is
    /// appended if the room has a free seat.
    ///
    /// # Errors
    ///
    /// - `RoomError::RoomNotFound` if the room is absent
    /// - `RoomError::RoomFull` if the room already holds two members
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn admit(
        &self,
        room_id: &str,
        existing_token: Option<&str>,
    ) -> Result<Admission, RoomError> {
        let candidate = ids::generate_token()?;

        let outcome = self
            .store
            .admit(
                room_id,
                existing_token,
                &candidate,
                ROOM_CAPACITY,
                now_millis(),
            )
            .await?;

        match outcome {
            AdmitOutcome::AlreadyMember => {
                metrics::record_admission("rejoined");
                debug!(target: "room.admission", "Existing member re-entered");
                // AlreadyMember is only reported for a supplied token
                let token = existing_token.unwrap_or_default().to_string();
                Ok(Admission {
                    token,
                    is_new: false,
                })
            }
            AdmitOutcome::Admitted => {
                metrics::record_admission("admitted");
                info!(target: "room.admission", "Participant admitted");
                Ok(Admission {
                    token: candidate,
                    is_new: true,
                })
            }
            AdmitOutcome::Full => {
                metrics::record_admission("full");
                warn!(target: "room.admission", "Admission rejected, room full");
                Err(RoomError::RoomFull(room_id.to_string()))
            }
            AdmitOutcome::RoomMissing => {
                metrics::record_admission("not_found");
                debug!(target: "room.admission", "Admission rejected, room not found");
                Err(RoomError::RoomNotFound(room_id.to_string()))
            }
        }
    }

    /// Confirm `token` is a current member of `room_id`.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Unauthorized` when the room is absent or the token
    /// is not a member.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn verify_membership(
        &self,
        room_id: &str,
        token: &str,
    ) -> Result<(), RoomError> {
        let connected = self
            .store
            .connected_tokens(room_id)
            .await?
            .ok_or_else(|| RoomError::Unauthorized("Room not found".to_string()))?;

        if !connected.iter().any(|t| t == token) {
            debug!(target: "room.admission", "Token is not a member");
            return Err(RoomError::Unauthorized("Not a room member".to_string()));
        }

        Ok(())
    }
}
