//! Realtime (SSE) integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use reqwest::header::COOKIE;
use reqwest::{Client, Response};
use room_test_utils::fixtures::{create_room, join_room};
use room_test_utils::TestRoomServer;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// Read SSE chunks until the accumulated body contains `needle`.
async fn read_until(response: &mut Response, needle: &str) -> Result<String> {
    let mut body = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !body.contains(needle) {
            match response.chunk().await? {
                Some(chunk) => body.push_str(&String::from_utf8_lossy(&chunk)),
                None => anyhow::bail!("stream ended before {needle:?}; got {body:?}"),
            }
        }
        Ok(())
    })
    .await??;
    Ok(body)
}

async fn connect(client: &Client, base_url: &str, room_id: &str, cookie: &str) -> Result<Response> {
    let response = client
        .get(format!("{base_url}/api/realtime?roomId={room_id}"))
        .header(COOKIE, cookie)
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str()?,
        "text/event-stream"
    );
    Ok(response)
}

#[tokio::test]
async fn test_subscriber_receives_message_then_destroy() -> Result<()> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let url = server.url();
    let room_id = create_room(&client, &url).await?;
    let alice = join_room(&client, &url, &room_id).await?;
    let bob = join_room(&client, &url, &room_id).await?;

    let mut stream = connect(&client, &url, &room_id, &bob).await?;

    client
        .post(format!("{url}/api/messages?roomId={room_id}"))
        .header(COOKIE, &alice)
        .json(&json!({ "sender": "alice", "text": "ping" }))
        .send()
        .await?
        .error_for_status()?;

    let body = read_until(&mut stream, "event: chat.message").await?;
    let body = if body.contains("\"ping\"") {
        body
    } else {
        read_until(&mut stream, "\"ping\"").await?
    };
    assert!(body.contains("\"sender\":\"alice\""));

    client
        .delete(format!("{url}/api/room?roomId={room_id}"))
        .header(COOKIE, &alice)
        .send()
        .await?
        .error_for_status()?;

    let body = read_until(&mut stream, "event: chat.destroy").await?;
    let body = if body.contains("isDestroyed") {
        body
    } else {
        read_until(&mut stream, "isDestroyed").await?
    };
    assert!(body.contains(r#"{"isDestroyed":true}"#));

    // Destroy is terminal: the server closes the stream
    let rest = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(chunk) = stream.chunk().await? {
            assert!(!String::from_utf8_lossy(&chunk).contains("event:"));
        }
        Ok::<_, anyhow::Error>(())
    })
    .await;
    assert!(rest.is_ok(), "stream stayed open after destroy");
    Ok(())
}

#[tokio::test]
async fn test_subscriber_gets_destroy_when_room_expires() -> Result<()> {
    let server = TestRoomServer::spawn_with(HashMap::from([(
        "ROOM_TTL_SECONDS".to_string(),
        "1".to_string(),
    )]))
    .await?;
    let client = Client::new();
    let url = server.url();
    let room_id = create_room(&client, &url).await?;
    let alice = join_room(&client, &url, &room_id).await?;

    let mut stream = connect(&client, &url, &room_id, &alice).await?;
    let body = read_until(&mut stream, "isDestroyed").await?;
    assert!(body.contains("event: chat.destroy"));

    // Synthesized locally, not published
    assert_eq!(server.events().destroy_count(&room_id), 0);
    Ok(())
}

#[tokio::test]
async fn test_realtime_requires_membership() -> Result<()> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let room_id = create_room(&client, &server.url()).await?;

    let response = client
        .get(format!("{}/api/realtime?roomId={room_id}", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    Ok(())
}
