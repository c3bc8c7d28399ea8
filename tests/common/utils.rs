#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use fitbattle_backend::config::settings::RealtimeSettings;
use fitbattle_backend::run;
use fitbattle_backend::store::{InMemoryStore, KeyValueStore};
use fitbattle_backend::telemetry::{get_subscriber, init_subscriber};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub ws_address: String,
    pub store: Arc<dyn KeyValueStore>,
}

/// Run the server on a random port backed by a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_store(Arc::new(InMemoryStore::new())).await
}

pub async fn spawn_app_with_store(store: Arc<dyn KeyValueStore>) -> TestApp {
    Lazy::force(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = run(listener, store.clone(), RealtimeSettings::default())
        .await
        .expect("Failed to start server");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        ws_address: format!("ws://127.0.0.1:{}/ws/leaderboard", port),
        store,
    }
}

impl TestApp {
    pub async fn sync(&self, body: Value) -> reqwest::Response {
        Client::new()
            .post(&format!("{}/fitness/sync", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn update_score(&self, competition_id: &str, user_id: &str, user_name: &str, steps: i64) -> reqwest::Response {
        Client::new()
            .post(&format!("{}/leaderboard/update", self.address))
            .json(&json!({
                "user_id": user_id,
                "competition_id": competition_id,
                "user_name": user_name,
                "steps": steps
            }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_json(&self, path: &str) -> (reqwest::StatusCode, Value) {
        let response = Client::new()
            .get(&format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.");
        let status = response.status();
        let body = response.json::<Value>().await.expect("Cannot turn into a json.");
        (status, body)
    }

    pub async fn post_json(&self, path: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let response = Client::new()
            .post(&format!("{}{}", self.address, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");
        let status = response.status();
        let body = response.json::<Value>().await.expect("Cannot turn into a json.");
        (status, body)
    }

    /// Open a websocket and consume the `connected` greeting.
    pub async fn connect_ws(&self) -> WsStream {
        let (mut ws, _) = connect_async(self.ws_address.as_str())
            .await
            .expect("Failed to connect WebSocket");
        let greeting = next_event(&mut ws).await.expect("Expected a connected event");
        assert_eq!(greeting["type"], "connected");
        ws
    }
}

pub fn sync_body(user_id: &str, competition_id: &str, steps: i64, date: &str) -> Value {
    json!({
        "user_id": user_id,
        "competition_id": competition_id,
        "steps": steps,
        "distance": steps as f64 * 0.8,
        "calories": steps as f64 * 0.04,
        "active_minutes": steps / 100,
        "date": date
    })
}

pub async fn send_json(ws: &mut WsStream, value: Value) {
    ws.send(Message::Text(value.to_string()))
        .await
        .expect("Failed to send WebSocket message");
}

/// Next JSON text frame, skipping control frames. `None` after two seconds.
pub async fn next_event(ws: &mut WsStream) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let frame = tokio::time::timeout_at(deadline, ws.next()).await.ok()??.ok()?;
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).ok();
        }
    }
}

/// Skip events until one of the given type arrives.
pub async fn next_event_of_type(ws: &mut WsStream, event_type: &str) -> Option<Value> {
    loop {
        let event = next_event(ws).await?;
        if event["type"] == event_type {
            return Some(event);
        }
    }
}

/// True when nothing arrives for a short while.
pub async fn stays_quiet(ws: &mut WsStream) -> bool {
    let quiet = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(_))) => return,
                Some(Ok(_)) => continue,
                _ => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    quiet.is_err()
}

pub async fn subscribe(ws: &mut WsStream, competition_id: &str) {
    send_json(ws, json!({"type": "subscribe", "competition_id": competition_id})).await;
    let ack = next_event_of_type(ws, "subscribed").await.expect("Expected a subscribed ack");
    assert_eq!(ack["competition_id"], competition_id);
    let initial = next_event_of_type(ws, "leaderboard_update")
        .await
        .expect("Expected the current leaderboard after subscribing");
    assert_eq!(initial["competition_id"], competition_id);
}
