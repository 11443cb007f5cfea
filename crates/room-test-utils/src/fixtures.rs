//! Configuration and session helpers for integration tests.

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Response};
use room_service::auth::SESSION_COOKIE_NAME;
use std::collections::HashMap;

/// Session secret used by test servers.
pub const TEST_SESSION_SECRET: &str = "test-session-secret-0123456789abcdef";

/// Environment for a test server: in-memory store, insecure cookies so they
/// travel over plain http.
pub fn test_vars() -> HashMap<String, String> {
    HashMap::from([
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("ROOM_STORE".to_string(), "memory".to_string()),
        (
            "SESSION_SECRET".to_string(),
            TEST_SESSION_SECRET.to_string(),
        ),
        ("SESSION_COOKIE_SECURE".to_string(), "false".to_string()),
        ("SSE_KEEPALIVE_SECONDS".to_string(), "1".to_string()),
    ])
}

/// The `name=value` pair of the session cookie set by `response`, ready to
/// be sent back in a `Cookie` header.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
        .map(str::to_string)
}

/// POST /api/room/create and return the new room id.
pub async fn create_room(client: &Client, base_url: &str) -> Result<String, anyhow::Error> {
    let response = client
        .post(format!("{base_url}/api/room/create"))
        .send()
        .await?
        .error_for_status()?;
    let body: serde_json::Value = response.json().await?;
    body["roomId"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("create response has no roomId"))
}

/// GET /room/{room_id}, optionally presenting an existing session cookie.
pub async fn enter_room(
    client: &Client,
    base_url: &str,
    room_id: &str,
    cookie: Option<&str>,
) -> Result<Response, anyhow::Error> {
    let mut request = client.get(format!("{base_url}/room/{room_id}"));
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    Ok(request.send().await?)
}

/// Enter `room_id` as a new participant and return their session cookie.
pub async fn join_room(
    client: &Client,
    base_url: &str,
    room_id: &str,
) -> Result<String, anyhow::Error> {
    let response = enter_room(client, base_url, room_id, None)
        .await?
        .error_for_status()?;
    session_cookie(&response).ok_or_else(|| anyhow::anyhow!("admission set no session cookie"))
}
