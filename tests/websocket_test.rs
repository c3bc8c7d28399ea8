use serde_json::json;

mod common;
use common::utils::{next_event, next_event_of_type, send_json, spawn_app, stays_quiet, subscribe, sync_body};

#[actix_web::test]
async fn subscriber_receives_score_updates() {
    let test_app = spawn_app().await;
    let mut ws = test_app.connect_ws().await;
    subscribe(&mut ws, "c1").await;

    test_app.update_score("c1", "u1", "Ann", 1500).await;

    let event = next_event_of_type(&mut ws, "score_update")
        .await
        .expect("Expected a score_update event");
    assert_eq!(event["competition_id"], "c1");
    assert_eq!(event["user_id"], "u1");
    assert_eq!(event["score"], 1500);
}

#[actix_web::test]
async fn fitness_sync_is_pushed_to_subscribers() {
    let test_app = spawn_app().await;
    let mut ws = test_app.connect_ws().await;
    subscribe(&mut ws, "c1").await;

    test_app.sync(sync_body("u1", "c1", 700, "2024-03-09")).await;

    let event = next_event_of_type(&mut ws, "score_update")
        .await
        .expect("Expected a score_update event");
    assert_eq!(event["score"], 700);
}

#[actix_web::test]
async fn events_stay_in_their_competition() {
    let test_app = spawn_app().await;
    let mut in_a = test_app.connect_ws().await;
    let mut in_b = test_app.connect_ws().await;
    subscribe(&mut in_a, "A").await;
    subscribe(&mut in_b, "B").await;

    test_app.update_score("B", "u1", "Ann", 10).await;

    let event = next_event_of_type(&mut in_b, "score_update").await.unwrap();
    assert_eq!(event["competition_id"], "B");
    assert!(stays_quiet(&mut in_a).await);
}

#[actix_web::test]
async fn switching_competitions_leaves_the_old_room() {
    let test_app = spawn_app().await;
    let mut ws = test_app.connect_ws().await;
    subscribe(&mut ws, "A").await;
    subscribe(&mut ws, "B").await;

    test_app.update_score("A", "u1", "Ann", 10).await;
    assert!(stays_quiet(&mut ws).await);

    test_app.update_score("B", "u1", "Ann", 20).await;
    let event = next_event_of_type(&mut ws, "score_update").await.unwrap();
    assert_eq!(event["competition_id"], "B");
}

#[actix_web::test]
async fn unsubscribe_stops_updates() {
    let test_app = spawn_app().await;
    let mut ws = test_app.connect_ws().await;
    subscribe(&mut ws, "c1").await;

    send_json(&mut ws, json!({"type": "unsubscribe", "competition_id": "c1"})).await;
    let ack = next_event_of_type(&mut ws, "unsubscribed").await.unwrap();
    assert_eq!(ack["competition_id"], "c1");

    test_app.update_score("c1", "u1", "Ann", 10).await;
    assert!(stays_quiet(&mut ws).await);
}

#[actix_web::test]
async fn subscribing_sends_current_leaderboard_to_that_session_only() {
    let test_app = spawn_app().await;
    test_app.update_score("c1", "u1", "Ann", 1200).await;
    test_app.update_score("c1", "u2", "Bob", 1700).await;

    let mut watcher = test_app.connect_ws().await;
    subscribe(&mut watcher, "c1").await;

    let mut ws = test_app.connect_ws().await;
    send_json(&mut ws, json!({"type": "subscribe", "competition_id": "c1"})).await;
    let ack = next_event(&mut ws).await.unwrap();
    assert_eq!(ack["type"], "subscribed");

    let initial = next_event(&mut ws).await.unwrap();
    assert_eq!(initial["type"], "leaderboard_update");
    assert_eq!(initial["competition_id"], "c1");
    assert_eq!(initial["data"]["total_count"], 2);
    assert_eq!(initial["data"]["entries"][0]["user_id"], "u2");
    assert_eq!(initial["data"]["entries"][0]["user_name"], "Bob");
    assert_eq!(initial["data"]["entries"][1]["rank"], 2);

    assert!(stays_quiet(&mut watcher).await);
}

#[actix_web::test]
async fn subscribing_to_empty_competition_sends_empty_leaderboard() {
    let test_app = spawn_app().await;
    let mut ws = test_app.connect_ws().await;
    send_json(&mut ws, json!({"type": "subscribe", "competition_id": "fresh"})).await;

    let initial = next_event_of_type(&mut ws, "leaderboard_update").await.unwrap();
    assert_eq!(initial["competition_id"], "fresh");
    assert_eq!(initial["data"]["total_count"], 0);
    assert_eq!(initial["data"]["entries"].as_array().map(Vec::len), Some(0));
}

#[actix_web::test]
async fn broadcast_pushes_full_leaderboard() {
    let test_app = spawn_app().await;
    test_app.update_score("c1", "u1", "Ann", 1200).await;
    test_app.update_score("c1", "u2", "Bob", 1700).await;

    let mut ws = test_app.connect_ws().await;
    subscribe(&mut ws, "c1").await;

    let (status, _) = test_app
        .post_json("/leaderboard/c1/broadcast?limit=10", json!({}))
        .await;
    assert!(status.is_success());

    let event = next_event_of_type(&mut ws, "leaderboard_update").await.unwrap();
    assert_eq!(event["competition_id"], "c1");
    assert_eq!(event["data"]["entries"][0]["user_id"], "u2");
    assert_eq!(event["data"]["total_count"], 2);
}

#[actix_web::test]
async fn malformed_and_incomplete_messages_get_errors() {
    let test_app = spawn_app().await;
    let mut ws = test_app.connect_ws().await;

    send_json(&mut ws, json!({"type": "subscribe"})).await;
    let error = next_event(&mut ws).await.unwrap();
    assert_eq!(error["type"], "error");
    assert_eq!(error["message"], "Competition ID is required");

    send_json(&mut ws, json!({"type": "dance"})).await;
    let error = next_event(&mut ws).await.unwrap();
    assert_eq!(error["type"], "error");
    assert_eq!(error["message"], "Invalid message format");
}

#[actix_web::test]
async fn ping_gets_pong() {
    let test_app = spawn_app().await;
    let mut ws = test_app.connect_ws().await;

    send_json(&mut ws, json!({"type": "ping"})).await;
    let pong = next_event(&mut ws).await.unwrap();
    assert_eq!(pong["type"], "pong");
    assert!(pong["timestamp"].is_string());
}
