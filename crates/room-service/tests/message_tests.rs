//! Message log integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use reqwest::header::COOKIE;
use reqwest::Client;
use room_test_utils::fixtures::{create_room, join_room};
use room_test_utils::TestRoomServer;
use serde_json::{json, Value};

async fn send(
    client: &Client,
    base_url: &str,
    room_id: &str,
    cookie: &str,
    body: Value,
) -> Result<reqwest::Response> {
    Ok(client
        .post(format!("{base_url}/api/messages?roomId={room_id}"))
        .header(COOKIE, cookie)
        .json(&body)
        .send()
        .await?)
}

async fn list(client: &Client, base_url: &str, room_id: &str, cookie: &str) -> Result<Value> {
    let response = client
        .get(format!("{base_url}/api/messages?roomId={room_id}"))
        .header(COOKIE, cookie)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}

#[tokio::test]
async fn test_sender_sees_own_token_peer_does_not() -> Result<()> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let url = server.url();
    let room_id = create_room(&client, &url).await?;
    let alice = join_room(&client, &url, &room_id).await?;
    let bob = join_room(&client, &url, &room_id).await?;

    let sent = send(
        &client,
        &url,
        &room_id,
        &alice,
        json!({ "sender": "alice", "text": "hello" }),
    )
    .await?;
    assert_eq!(sent.status(), 200);
    let sent: Value = sent.json().await?;
    assert_eq!(sent["text"], "hello");
    assert_eq!(sent["roomId"], room_id.as_str());
    let alice_token = sent["token"].as_str().unwrap().to_string();

    let seen_by_alice = list(&client, &url, &room_id, &alice).await?;
    assert_eq!(seen_by_alice["messages"][0]["token"], alice_token.as_str());

    let seen_by_bob = list(&client, &url, &room_id, &bob).await?;
    assert_eq!(seen_by_bob["messages"][0]["text"], "hello");
    assert!(seen_by_bob["messages"][0].get("token").is_none());

    assert_eq!(server.events().message_count(&room_id), 1);
    Ok(())
}

#[tokio::test]
async fn test_messages_listed_in_send_order() -> Result<()> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let url = server.url();
    let room_id = create_room(&client, &url).await?;
    let alice = join_room(&client, &url, &room_id).await?;
    let bob = join_room(&client, &url, &room_id).await?;

    for (cookie, text) in [(&alice, "one"), (&bob, "two"), (&alice, "three")] {
        send(
            &client,
            &url,
            &room_id,
            cookie,
            json!({ "sender": "someone", "text": text }),
        )
        .await?
        .error_for_status()?;
    }

    let listed = list(&client, &url, &room_id, &bob).await?;
    let texts: Vec<_> = listed["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
    Ok(())
}

#[tokio::test]
async fn test_invalid_messages_rejected() -> Result<()> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let url = server.url();
    let room_id = create_room(&client, &url).await?;
    let alice = join_room(&client, &url, &room_id).await?;

    for body in [
        json!({ "sender": "", "text": "hi" }),
        json!({ "sender": "alice", "text": "" }),
        json!({ "sender": "x".repeat(101), "text": "hi" }),
        json!({ "sender": "alice", "text": "y".repeat(1001) }),
        json!({ "sender": "alice" }),
        json!({ "sender": "alice", "text": "hi", "extra": true }),
    ] {
        let response = send(&client, &url, &room_id, &alice, body).await?;
        assert_eq!(response.status(), 400);
        let error: Value = response.json().await?;
        assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
    }

    assert_eq!(server.events().message_count(&room_id), 0);
    Ok(())
}

#[tokio::test]
async fn test_messages_require_membership() -> Result<()> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let url = server.url();
    let room_id = create_room(&client, &url).await?;
    let alice = join_room(&client, &url, &room_id).await?;

    // No cookie
    let response = client
        .get(format!("{url}/api/messages?roomId={room_id}"))
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    // No roomId
    let response = client
        .get(format!("{url}/api/messages"))
        .header(COOKIE, &alice)
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    // Cookie for a different room
    let other_room = create_room(&client, &url).await?;
    let response = send(
        &client,
        &url,
        &other_room,
        &alice,
        json!({ "sender": "alice", "text": "hi" }),
    )
    .await?;
    assert_eq!(response.status(), 401);
    let error: Value = response.json().await?;
    assert_eq!(error["error"]["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn test_room_info_reports_membership() -> Result<()> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let url = server.url();
    let room_id = create_room(&client, &url).await?;
    let alice = join_room(&client, &url, &room_id).await?;

    let info: Value = client
        .get(format!("{url}/api/room?roomId={room_id}"))
        .header(COOKIE, &alice)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    assert_eq!(info["roomId"], room_id.as_str());
    assert_eq!(info["participants"], 1);
    assert_eq!(info["capacity"], 2);
    assert!(info["ttl"].as_u64().unwrap() <= 600);
    assert!(info["joinedAt"].as_i64().unwrap() >= info["createdAt"].as_i64().unwrap());
    Ok(())
}
