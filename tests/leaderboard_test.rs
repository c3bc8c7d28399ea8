use reqwest::StatusCode;

mod common;
use common::utils::spawn_app;

#[actix_web::test]
async fn leaderboard_orders_by_score() {
    let test_app = spawn_app().await;

    assert_eq!(test_app.update_score("c1", "u1", "Ann", 1200).await.status(), StatusCode::OK);
    assert_eq!(test_app.update_score("c1", "u2", "Bob", 1700).await.status(), StatusCode::OK);

    let (status, body) = test_app.get_json("/leaderboard/c1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["competition_id"], "c1");
    assert_eq!(data["total_count"], 2);
    let entries = data["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["user_id"], "u2");
    assert_eq!(entries[0]["user_name"], "Bob");
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[1]["user_id"], "u1");
    assert_eq!(entries[1]["rank"], 2);
}

#[actix_web::test]
async fn limit_caps_entries_but_not_total_count() {
    let test_app = spawn_app().await;
    for i in 0..5 {
        test_app.update_score("c1", &format!("u{}", i), "Runner", 100 * (i + 1)).await;
    }

    let (_, body) = test_app.get_json("/leaderboard/c1?limit=2").await;
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["total_count"], 5);

    let (_, body) = test_app.get_json("/leaderboard/c1?limit=0").await;
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn empty_competition_has_empty_leaderboard() {
    let test_app = spawn_app().await;

    let (status, body) = test_app.get_json("/leaderboard/nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["entries"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["total_count"], 0);
}

#[actix_web::test]
async fn score_update_replaces_previous_score() {
    let test_app = spawn_app().await;

    test_app.update_score("c1", "u1", "Ann", 500).await;
    test_app.update_score("c1", "u1", "Ann", 300).await;

    let (_, body) = test_app.get_json("/leaderboard/c1").await;
    assert_eq!(body["data"]["total_count"], 1);
    assert_eq!(body["data"]["entries"][0]["score"], 300);
}

#[actix_web::test]
async fn user_rank_is_one_based() {
    let test_app = spawn_app().await;
    test_app.update_score("c1", "u1", "Ann", 1200).await;
    test_app.update_score("c1", "u2", "Bob", 1700).await;

    let (status, body) = test_app.get_json("/leaderboard/c1/users/u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rank"], 2);
    assert_eq!(body["data"]["score"], 1200);
    assert_eq!(body["data"]["total_count"], 2);

    let (status, body) = test_app.get_json("/leaderboard/c1/users/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn invalid_score_update_is_rejected() {
    let test_app = spawn_app().await;

    assert_eq!(test_app.update_score("", "u1", "Ann", 10).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test_app.update_score("c1", "u1", "Ann", -10).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn non_numeric_limit_is_a_json_validation_error() {
    let test_app = spawn_app().await;

    let (status, body) = test_app.get_json("/leaderboard/c1?limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Invalid query string"));
}

#[actix_web::test]
async fn malformed_score_update_body_is_a_json_validation_error() {
    let test_app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/leaderboard/update", test_app.address))
        .header("Content-Type", "application/json")
        .body("{\"competition_id\": ")
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.json::<serde_json::Value>().await.expect("Cannot turn into a json.");
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Invalid JSON body"));
}
