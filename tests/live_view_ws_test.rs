use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};

use torneo_backend::cache::STANDINGS_KEY;
use torneo_backend::models::change::{ChangeEvent, ChangeKind, Table};

mod common;
use common::utils::{spawn_app, standing, TestApp};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(test_app: &TestApp, path: &str) -> Socket {
    let url = format!("{}{}", test_app.ws_address, path);
    let (ws_stream, _) = connect_async(url)
        .await
        .expect("Failed to connect to WebSocket server");
    ws_stream
}

/// Next JSON text frame, skipping control frames.
async fn next_json(ws_stream: &mut Socket) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws_stream.next())
            .await
            .expect("Timed out waiting for a message")
            .expect("Socket closed")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("Message is not JSON");
        }
    }
}

async fn next_settled_snapshot(ws_stream: &mut Socket) -> serde_json::Value {
    loop {
        let snapshot = next_json(ws_stream).await;
        if snapshot["type"] == "snapshot" && snapshot["loading"] == false {
            return snapshot;
        }
    }
}

async fn wait_for_channels(test_app: &TestApp, expected: usize) {
    for _ in 0..100 {
        if test_app.change_feed.active_channels() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "expected {} active channels, found {}",
        expected,
        test_app.change_feed.active_channels()
    );
}

#[tokio::test]
async fn standings_socket_shows_cache_then_settles() {
    let test_app = spawn_app().await;
    let cached = vec![standing("Team A", 1, 10), standing("Team B", 2, 7)];
    test_app.cache.set(STANDINGS_KEY, &cached, 3600);
    test_app.network.set_online(false);

    let mut ws_stream = connect(&test_app, "/ws/live/standings").await;

    // Cached rows are shown before the first fetch completes
    let first = next_json(&mut ws_stream).await;
    assert_eq!(first["type"], "snapshot");
    assert_eq!(first["view"], "standings");
    assert_eq!(first["data"][0]["team_name"], "Team A");

    let settled = next_settled_snapshot(&mut ws_stream).await;
    assert_eq!(settled["status"], "ready");
    assert!(settled["error"].is_null());
    assert_eq!(settled["data"].as_array().unwrap().len(), 2);

    wait_for_channels(&test_app, 2).await;
    ws_stream.close(None).await.expect("Failed to close socket");
    wait_for_channels(&test_app, 0).await;
}

#[tokio::test]
async fn change_notification_pushes_a_fresh_snapshot() {
    let test_app = spawn_app().await;
    test_app.cache.set(STANDINGS_KEY, &vec![standing("Team A", 1, 10)], 3600);
    test_app.network.set_online(false);

    let mut ws_stream = connect(&test_app, "/ws/live/standings").await;
    next_settled_snapshot(&mut ws_stream).await;
    wait_for_channels(&test_app, 2).await;

    test_app.cache.set(STANDINGS_KEY, &vec![standing("Team A", 1, 13)], 3600);
    test_app
        .change_feed
        .publish(ChangeEvent::new(Table::TeamStatistics, ChangeKind::Update));

    let refreshed = next_settled_snapshot(&mut ws_stream).await;
    assert_eq!(refreshed["data"][0]["points"], 13);
}

#[tokio::test]
async fn failed_initial_load_reports_an_error() {
    let test_app = spawn_app().await;

    let mut ws_stream = connect(&test_app, "/ws/live/top-scorers").await;
    let settled = next_settled_snapshot(&mut ws_stream).await;

    assert_eq!(settled["status"], "error");
    assert_eq!(settled["data"], serde_json::json!([]));
    assert!(settled["error"].as_str().unwrap().contains("Backend query failed"));
}

#[tokio::test]
async fn ping_command_gets_a_pong() {
    let test_app = spawn_app().await;
    let mut ws_stream = connect(&test_app, "/ws/live/top-scorers").await;

    ws_stream
        .send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await
        .expect("Failed to send ping");

    loop {
        let msg = next_json(&mut ws_stream).await;
        if msg["type"] == "pong" {
            break;
        }
    }
}

#[tokio::test]
async fn unknown_view_is_rejected() {
    let test_app = spawn_app().await;
    let url = format!("{}/ws/live/leaderboard", test_app.ws_address);
    assert!(connect_async(url).await.is_err());

    let url = format!("{}/ws/live/matches?status=postponed", test_app.ws_address);
    assert!(connect_async(url).await.is_err());
}
