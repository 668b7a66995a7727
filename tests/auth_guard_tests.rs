// tests/auth_guard_tests.rs
//
// Requests that are turned away before any query runs. The pool never
// connects, so these pass without a database.

mod common;

use anistream::utils::jwt::sign_jwt;
use serde_json::json;

fn token(id: i64, role: &str) -> String {
    sign_jwt(id, role, common::JWT_SECRET, 600).unwrap()
}

#[tokio::test]
async fn unknown_path_is_404() {
    let address = common::spawn_without_db().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn anonymous_comment_writes_are_rejected() {
    let address = common::spawn_without_db().await;
    let client = reqwest::Client::new();

    let create = client
        .post(&format!("{}/api/comments", address))
        .json(&json!({ "animeId": 1, "content": "hi", "isSpoiler": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(create.status().as_u16(), 401);
    let body: serde_json::Value = create.json().await.unwrap();
    assert_eq!(body["error"], "Login required");

    for path in ["/api/comments/1/like", "/api/comments/1/dislike"] {
        let response = client
            .post(&format!("{}{}", address, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 401, "{}", path);
    }

    let pin = client
        .put(&format!("{}/api/comments/1", address))
        .json(&json!({ "isPinned": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(pin.status().as_u16(), 401);

    let delete = client
        .delete(&format!("{}/api/comments/1", address))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status().as_u16(), 401);
}

#[tokio::test]
async fn forged_token_counts_as_anonymous() {
    let address = common::spawn_without_db().await;
    let client = reqwest::Client::new();
    let forged = sign_jwt(1, "admin", "not_the_server_secret", 600).unwrap();

    let response = client
        .post(&format!("{}/api/comments/1/like", address))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let address = common::spawn_without_db().await;
    let client = reqwest::Client::new();

    let anonymous = client
        .get(&format!("{}/api/admin/users", address))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    let as_user = client
        .post(&format!("{}/api/admin/anime", address))
        .bearer_auth(token(5, "user"))
        .json(&json!({ "title": "Nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(as_user.status().as_u16(), 403);
}

#[tokio::test]
async fn profile_requires_login() {
    let address = common::spawn_without_db().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/profile/me", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn comment_listing_validates_query() {
    let address = common::spawn_without_db().await;
    let client = reqwest::Client::new();

    let missing_target = client
        .get(&format!("{}/api/comments", address))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_target.status().as_u16(), 400);

    let bad_sort = client
        .get(&format!("{}/api/comments/render?animeId=1&sort=oldest", address))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_sort.status().as_u16(), 400);
}
