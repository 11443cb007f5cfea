//! Membership guard for room-scoped routes.
//!
//! Every content-affecting route names its room in the `roomId` query
//! parameter and proves membership with the signed `x-auth-token` cookie.
//! The guard rejects with 401 when either is missing, the signature does not
//! verify, or the token is no longer in the room's membership, and otherwise
//! injects [`RoomAuth`] into the request extensions.

use crate::auth::SessionSigner;
use crate::errors::RoomError;
use crate::models::RoomQuery;
use crate::services::AdmissionController;
use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the membership guard.
#[derive(Clone)]
pub struct AuthState {
    pub admission: AdmissionController,
    pub session: SessionSigner,
}

/// Authenticated room context for downstream handlers.
#[derive(Debug, Clone)]
pub struct RoomAuth {
    pub room_id: String,
    pub token: String,
}

fn room_id_from_request(req: &Request) -> Result<String, RoomError> {
    Query::<RoomQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(query)| query.room_id)
        .filter(|room_id| !room_id.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "room.middleware.auth", "Missing roomId query parameter");
            RoomError::Unauthorized("Missing roomId".to_string())
        })
}

/// Membership guard.
///
/// # Response
///
/// - Returns 401 Unauthorized if the room id or a valid session cookie is
///   missing, or the token is not a current member
/// - Continues to the next handler with [`RoomAuth`] in extensions otherwise
#[instrument(skip_all, name = "room.middleware.auth")]
pub async fn require_membership(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, RoomError> {
    let room_id = room_id_from_request(&req)?;

    let token = state
        .session
        .token_from_headers(&room_id, req.headers())
        .ok_or_else(|| {
            tracing::debug!(target: "room.middleware.auth", "Missing or invalid session cookie");
            RoomError::Unauthorized("Missing or invalid session".to_string())
        })?;

    state.admission.verify_membership(&room_id, &token).await?;

    req.extensions_mut().insert(RoomAuth { room_id, token });

    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::Room;
    use crate::store::{MemoryRoomStore, RoomStore};
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use secrecy::SecretString;
    use std::time::Duration;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn whoami(Extension(auth): Extension<RoomAuth>) -> String {
        format!("{}:{}", auth.room_id, auth.token)
    }

    async fn setup() -> (Router, SessionSigner, String) {
        let store = Arc::new(MemoryRoomStore::new());
        store
            .create_room(&Room::new("r".to_string(), 0), Duration::from_secs(600))
            .await
            .unwrap();
        let admission = AdmissionController::new(store);
        let token = admission.admit("r", None).await.unwrap().token;
        let session = SessionSigner::new(
            SecretString::from("a-session-secret-that-is-long-enough!!"),
            false,
        );

        let state = Arc::new(AuthState {
            admission,
            session: session.clone(),
        });
        let app = Router::new()
            .route("/guarded", get(whoami))
            .route_layer(middleware::from_fn_with_state(state, require_membership));

        (app, session, token)
    }

    fn request(uri: &str, cookie: Option<String>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_member_passes() {
        let (app, session, token) = setup().await;
        let cookie = format!("x-auth-token={}", session.sign("r", &token));

        let response = app
            .oneshot(request("/guarded?roomId=r", Some(cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Downstream handlers see the verified room and token
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, format!("r:{token}").as_bytes());
    }

    #[tokio::test]
    async fn test_missing_room_id_rejected() {
        let (app, session, token) = setup().await;
        let cookie = format!("x-auth-token={}", session.sign("r", &token));

        let response = app.oneshot(request("/guarded", Some(cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_cookie_rejected() {
        let (app, _, _) = setup().await;
        let response = app.oneshot(request("/guarded?roomId=r", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unsigned_token_rejected() {
        let (app, _, token) = setup().await;
        let cookie = format!("x-auth-token={token}");

        let response = app
            .oneshot(request("/guarded?roomId=r", Some(cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signed_non_member_rejected() {
        let (app, session, _) = setup().await;
        let cookie = format!("x-auth-token={}", session.sign("r", "not-a-member"));

        let response = app
            .oneshot(request("/guarded?roomId=r", Some(cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
