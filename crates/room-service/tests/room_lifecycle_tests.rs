//! Room lifecycle integration tests: TTL, destroy, expiry.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use reqwest::header::COOKIE;
use reqwest::Client;
use room_service::store::RoomStore;
use room_test_utils::fixtures::{create_room, enter_room, join_room};
use room_test_utils::TestRoomServer;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

#[tokio::test]
async fn test_ttl_counts_down_from_configured_lifetime() -> Result<()> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let url = server.url();
    let room_id = create_room(&client, &url).await?;
    let alice = join_room(&client, &url, &room_id).await?;

    let body: Value = client
        .get(format!("{url}/api/room/ttl?roomId={room_id}"))
        .header(COOKIE, &alice)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let ttl = body["ttl"].as_u64().unwrap();
    assert!(ttl > 590 && ttl <= 600, "unexpected ttl {ttl}");
    Ok(())
}

#[tokio::test]
async fn test_ttl_requires_membership() -> Result<()> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let room_id = create_room(&client, &server.url()).await?;

    let response = client
        .get(format!("{}/api/room/ttl?roomId={room_id}", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_destroy_with_pending_messages() -> Result<()> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let url = server.url();
    let room_id = create_room(&client, &url).await?;
    let alice = join_room(&client, &url, &room_id).await?;
    let bob = join_room(&client, &url, &room_id).await?;

    client
        .post(format!("{url}/api/messages?roomId={room_id}"))
        .header(COOKIE, &alice)
        .json(&json!({ "sender": "alice", "text": "about to vanish" }))
        .send()
        .await?
        .error_for_status()?;

    let response = client
        .delete(format!("{url}/api/room?roomId={room_id}"))
        .header(COOKIE, &bob)
        .send()
        .await?;
    assert_eq!(response.status(), 204);

    // Every key is gone
    assert!(server.store().get_room(&room_id).await?.is_none());
    assert!(server.store().list_messages(&room_id).await?.is_empty());
    assert_eq!(server.store().delete_room(&room_id).await?, 0);

    // Former members are no longer authorized
    let response = client
        .get(format!("{url}/api/messages?roomId={room_id}"))
        .header(COOKIE, &alice)
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    // The gate no longer knows the room
    let response = enter_room(&client, &url, &room_id, Some(&alice)).await?;
    assert_eq!(response.status(), 404);

    // A second destroy attempt is refused by the guard and publishes nothing
    let response = client
        .delete(format!("{url}/api/room?roomId={room_id}"))
        .header(COOKIE, &alice)
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    assert_eq!(server.events().destroy_count(&room_id), 1);
    Ok(())
}

#[tokio::test]
async fn test_room_expires_after_ttl() -> Result<()> {
    let server = TestRoomServer::spawn_with(HashMap::from([(
        "ROOM_TTL_SECONDS".to_string(),
        "1".to_string(),
    )]))
    .await?;
    let client = Client::new();
    let url = server.url();
    let room_id = create_room(&client, &url).await?;
    let alice = join_room(&client, &url, &room_id).await?;

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let response = enter_room(&client, &url, &room_id, None).await?;
    assert_eq!(response.status(), 404);

    let response = client
        .get(format!("{url}/api/room/ttl?roomId={room_id}"))
        .header(COOKIE, &alice)
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    // Expiry is passive: nothing was published
    assert_eq!(server.events().destroy_count(&room_id), 0);
    Ok(())
}
