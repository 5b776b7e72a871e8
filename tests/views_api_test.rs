use reqwest::{Client, StatusCode};
use uuid::Uuid;

use torneo_backend::cache::STANDINGS_KEY;

mod common;
use common::utils::{spawn_app, standing};

#[tokio::test]
async fn standings_served_from_cache_while_offline() {
    let test_app = spawn_app().await;
    let cached = vec![standing("Team A", 1, 10), standing("Team B", 2, 7)];
    test_app.cache.set(STANDINGS_KEY, &cached, 3600);
    test_app.network.set_online(false);

    let response = Client::new()
        .get(&format!("{}/api/standings", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["success"], true);
    assert_eq!(body["offline"], true);
    assert_eq!(body["data"][0]["team_name"], "Team A");
    assert_eq!(body["data"][1]["points"], 7);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn standings_fail_while_offline_without_cache() {
    let test_app = spawn_app().await;
    test_app.network.set_online(false);

    let response = Client::new()
        .get(&format!("{}/api/standings", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn standings_fail_when_online_even_with_cache() {
    let test_app = spawn_app().await;
    test_app.cache.set(STANDINGS_KEY, &vec![standing("Team A", 1, 10)], 3600);

    let response = Client::new()
        .get(&format!("{}/api/standings", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn top_scorers_backend_failure_is_an_error() {
    let test_app = spawn_app().await;

    let response = Client::new()
        .get(&format!("{}/api/top-scorers", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to fetch top scorers");
}

#[tokio::test]
async fn matches_reject_unknown_status() {
    let test_app = spawn_app().await;
    let client = Client::new();

    for path in ["/api/matches?status=postponed", "/api/matches/by-date?status=live"] {
        let response = client
            .get(&format!("{}{}", &test_app.address, path))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", path);
        let body: serde_json::Value = response.json().await.expect("Cannot turn into a json.");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn match_detail_requires_a_uuid() {
    let test_app = spawn_app().await;

    let response = Client::new()
        .get(&format!("{}/api/matches/not-a-match", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn match_detail_backend_failure_is_an_error() {
    let test_app = spawn_app().await;

    let response = Client::new()
        .get(&format!("{}/api/matches/{}", &test_app.address, Uuid::new_v4()))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
