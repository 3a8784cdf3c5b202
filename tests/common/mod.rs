//! Helpers shared by the router-level test suites.
#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use rusqlite::params;
use tempfile::TempDir;
use tower::ServiceExt;

use vignette::config::Config;
use vignette::db;
use vignette::routes;
use vignette::state::AppState;

pub const SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub _dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.secret = Some(SECRET.to_string());
    config.auth.bcrypt_cost = 4;
    config
}

pub fn test_state() -> (TempDir, AppState) {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    let state = AppState::new(pool, test_config()).unwrap();
    (dir, state)
}

pub fn test_app() -> TestApp {
    let (dir, state) = test_state();
    let router = routes::app(state.clone());
    TestApp {
        _dir: dir,
        state,
        router,
    }
}

impl TestApp {
    /// Insert a user directly and return a valid credential for them.
    pub fn seed_user(&self, id: &str, username: &str) -> String {
        let conn = self.state.db.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, username, password_hash) VALUES (?1, ?2, 'unused')",
            params![id, username],
        )
        .unwrap();
        self.state.tokens.issue(id).unwrap()
    }

    pub fn seed_post(&self, id: &str, author_id: &str) {
        let conn = self.state.db.get().unwrap();
        conn.execute(
            "INSERT INTO posts (id, author_id, caption, image, created_at)
             VALUES (?1, ?2, 'caption', 'https://img.example/1.jpg', ?3)",
            params![id, author_id, chrono::Utc::now()],
        )
        .unwrap();
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        json: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let resp = self.send(request(method, uri, token, json)).await;
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, value)
    }
}

pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    json: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("token={}", token));
    }
    match json {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()
}
