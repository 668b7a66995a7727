// tests/common/mod.rs

#![allow(dead_code)]

use std::net::SocketAddr;

use anistream::{config::Config, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::{PgPool, postgres::PgPoolOptions};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        cors_origins: vec!["http://localhost:3000".to_string()],
        admin_username: None,
        admin_password: None,
    }
}

/// Binds the router to a random port and serves it in the background.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
pub async fn serve(pool: PgPool, config: Config) -> String {
    let app = routes::create_router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

/// App whose pool never connects. Good for anything rejected before a query runs.
pub async fn spawn_without_db() -> String {
    let url = "postgres://postgres@127.0.0.1:1/unused";
    let pool = PgPoolOptions::new()
        .connect_lazy(url)
        .expect("lazy pool from a well-formed URL");
    serve(pool, test_config(url)).await
}

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub client: reqwest::Client,
}

/// App backed by the Postgres at DATABASE_URL, migrated.
/// `None` when DATABASE_URL is not set, so database tests can be skipped.
pub async fn spawn_app() -> Option<TestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let address = serve(pool.clone(), test_config(&database_url)).await;

    Some(TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    })
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a fresh user and returns (user id, bearer token).
    pub async fn user(&self, prefix: &str) -> (i64, String) {
        let username = unique_name(prefix);
        let password = "password123";

        let registered: Value = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Register failed")
            .json()
            .await
            .expect("Failed to parse register json");

        let login: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");

        (
            registered["id"].as_i64().expect("user id"),
            login["token"].as_str().expect("Token not found").to_string(),
        )
    }

    /// Registers a user, promotes it in the database, and logs in again so
    /// the token carries the admin role.
    pub async fn admin(&self) -> (i64, String) {
        let username = unique_name("adm");
        let password = "password123";

        self.client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();

        sqlx::query("UPDATE users SET role = 'admin' WHERE username = $1")
            .bind(&username)
            .execute(&self.pool)
            .await
            .unwrap();

        let login: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(login["role"], "admin");

        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = $1")
            .bind(&username)
            .fetch_one(&self.pool)
            .await
            .unwrap();

        (id, login["token"].as_str().unwrap().to_string())
    }

    /// Creates an anime with `episodes` numbered episodes; returns its id.
    pub async fn anime_with_episodes(&self, admin_token: &str, episodes: i32) -> i64 {
        let created: Value = self
            .client
            .post(self.url("/api/admin/anime"))
            .bearer_auth(admin_token)
            .json(&json!({
                "title": unique_name("Show"),
                "genres": ["Action", "Fantasy"],
                "status": "ongoing",
                "releaseYear": 2024,
                "rating": 8.5
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let anime_id = created["id"].as_i64().expect("anime id");

        if episodes > 0 {
            let report: Value = self
                .client
                .post(self.url(&format!("/api/admin/anime/{}/episodes/bulk", anime_id)))
                .bearer_auth(admin_token)
                .json(&json!({
                    "episodes": (1..=episodes).map(|n| json!({
                        "number": n,
                        "title": format!("Episode {}", n),
                        "sourceUrl": format!("https://embed.example.com/{}/{}", anime_id, n)
                    })).collect::<Vec<_>>()
                }))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(report["succeeded"], episodes);
        }

        anime_id
    }

    pub async fn comment(&self, token: &str, body: Value) -> Value {
        let response = self
            .client
            .post(self.url("/api/comments"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201, "comment creation failed");
        response.json().await.unwrap()
    }

    pub async fn list(&self, token: Option<&str>, query: &str) -> Vec<Value> {
        let mut request = self.client.get(self.url(&format!("/api/comments?{}", query)));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap().json().await.unwrap()
    }
}

/// Ids of a list of comment nodes, in order.
pub fn ids(nodes: &[Value]) -> Vec<i64> {
    nodes.iter().map(|n| n["id"].as_i64().unwrap()).collect()
}
