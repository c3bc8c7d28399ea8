use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use fitbattle_backend::store::{
    InMemoryStore, KeyValueStore, MessageStream, ScoreIncrement, StoreError,
};

mod common;
use common::utils::{spawn_app, spawn_app_with_store, sync_body};

#[actix_web::test]
async fn sync_returns_aggregated_stats() {
    let test_app = spawn_app().await;

    let response = test_app.sync(sync_body("u1", "c1", 3000, "2024-03-09")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["steps"], 3000);
    assert_eq!(body["data"]["source"], "google_fit");

    let response = test_app.sync(sync_body("u1", "c1", 2000, "2024-03-10T08:30:00Z")).await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["steps"], 5000);

    let (status, body) = test_app.get_json("/fitness/stats/u1?competition_id=c1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["steps"], 5000);
    assert_eq!(body["data"]["user_id"], "u1");
}

#[actix_web::test]
async fn resyncing_a_day_does_not_double_count() {
    let test_app = spawn_app().await;

    test_app.sync(sync_body("u1", "c1", 3000, "2024-03-09")).await;
    test_app.sync(sync_body("u1", "c1", 3000, "2024-03-09")).await;
    test_app.sync(sync_body("u1", "c1", 4000, "2024-03-09")).await;

    let (_, body) = test_app.get_json("/fitness/stats/u1?competition_id=c1").await;
    assert_eq!(body["data"]["steps"], 4000);
}

#[actix_web::test]
async fn sync_moves_user_on_leaderboard() {
    let test_app = spawn_app().await;

    test_app.sync(sync_body("u1", "c1", 1200, "2024-03-09")).await;
    test_app.sync(sync_body("u2", "c1", 800, "2024-03-09")).await;
    test_app.sync(sync_body("u2", "c1", 900, "2024-03-10")).await;

    let (status, body) = test_app.get_json("/leaderboard/c1").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"]["entries"].as_array().unwrap();
    assert_eq!(entries[0]["user_id"], "u2");
    assert_eq!(entries[0]["score"], 1700);
    assert_eq!(entries[1]["user_id"], "u1");
    assert_eq!(entries[1]["score"], 1200);
}

#[actix_web::test]
async fn stats_for_user_without_data_are_zeroed() {
    let test_app = spawn_app().await;

    let (status, body) = test_app.get_json("/fitness/stats/ghost?competition_id=c1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["steps"], 0);
    assert_eq!(body["data"]["last_synced_at"], serde_json::Value::Null);
}

#[actix_web::test]
async fn stats_require_competition_id() {
    let test_app = spawn_app().await;

    let (status, body) = test_app.get_json("/fitness/stats/u1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn invalid_sync_requests_are_rejected() {
    let test_app = spawn_app().await;
    let test_cases = vec![
        (sync_body("", "c1", 100, "2024-03-09"), "missing user"),
        (sync_body("u1", "", 100, "2024-03-09"), "missing competition"),
        (sync_body("u1", "c1", -1, "2024-03-09"), "negative steps"),
        (sync_body("u1", "c1", 100, "yesterday"), "bad date"),
        (json!({"user_id": "u1"}), "missing fields"),
    ];

    for (body, description) in test_cases {
        let response = test_app.sync(body).await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "Expected 400 for {}",
            description
        );
    }

    let (_, body) = test_app.get_json("/leaderboard/c1").await;
    assert_eq!(body["data"]["total_count"], 0);
}

/// Holds back the first aggregate read-back so a later sync can overtake it.
struct SlowFirstReadStore {
    inner: InMemoryStore,
    delayed: AtomicBool,
}

#[async_trait]
impl KeyValueStore for SlowFirstReadStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        self.inner.set(key, value, ttl_seconds).await
    }

    async fn swap(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<Option<String>, StoreError> {
        self.inner.swap(key, value, ttl_seconds).await
    }

    async fn hash_increment(
        &self,
        key: &str,
        increments: &[(&str, f64)],
        fields: &[(&str, String)],
        ttl_seconds: u64,
        score: Option<ScoreIncrement<'_>>,
    ) -> Result<(), StoreError> {
        self.inner.hash_increment(key, increments, fields, ttl_seconds, score).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        if !self.delayed.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(400)).await;
        }
        self.inner.hash_get_all(key).await
    }

    async fn sorted_set_add(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        self.inner.sorted_set_add(key, score, member).await
    }

    async fn sorted_set_range_desc(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>, StoreError> {
        self.inner.sorted_set_range_desc(key, start, stop).await
    }

    async fn sorted_set_rank(&self, key: &str, member: &str) -> Result<Option<u64>, StoreError> {
        self.inner.sorted_set_rank(key, member).await
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        self.inner.sorted_set_score(key, member).await
    }

    async fn sorted_set_cardinality(&self, key: &str) -> Result<u64, StoreError> {
        self.inner.sorted_set_cardinality(key).await
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError> {
        self.inner.publish(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StoreError> {
        self.inner.subscribe(channel).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[actix_web::test]
async fn overlapping_syncs_leave_ranking_equal_to_aggregate() {
    let store = Arc::new(SlowFirstReadStore {
        inner: InMemoryStore::new(),
        delayed: AtomicBool::new(false),
    });
    let test_app = spawn_app_with_store(store).await;

    let slow = test_app.sync(sync_body("u1", "c1", 100, "2024-03-09"));
    let fast = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        test_app.sync(sync_body("u1", "c1", 200, "2024-03-10")).await
    };
    let (slow, fast) = tokio::join!(slow, fast);
    assert_eq!(slow.status(), StatusCode::OK);
    assert_eq!(fast.status(), StatusCode::OK);

    let (_, stats) = test_app.get_json("/fitness/stats/u1?competition_id=c1").await;
    let (_, board) = test_app.get_json("/leaderboard/c1").await;
    assert_eq!(stats["data"]["steps"], 300);
    assert_eq!(board["data"]["entries"][0]["score"], stats["data"]["steps"]);

    let (_, rank) = test_app.get_json("/leaderboard/c1/users/u1").await;
    assert_eq!(rank["data"]["score"], 300);
}
