//! Shared helpers for integration tests: a stub media source, app state
//! construction, database seeding, and HTTP plumbing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use ccgram_api::cache::InMemoryCache;
use ccgram_api::config::Config;
use ccgram_api::instagram::{InstagramError, MediaSource};
use ccgram_api::routes::build_router;
use ccgram_api::state::AppState;

/// Media source stub that returns a fixed item array and counts calls.
pub struct StubSource {
    items: Value,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn new(items: Value) -> Arc<Self> {
        Arc::new(Self {
            items,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for StubSource {
    async fn recent_media(
        &self,
        _instagram_id: i64,
        _access_token: &str,
        _max_timestamp: i64,
        _min_timestamp: i64,
    ) -> Result<Value, InstagramError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.clone())
    }
}

/// Build a test `Config` with safe defaults. The database pool comes from
/// the test harness, so `database_url` is never dialed.
pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        redis_url: None,
        instagram_api_base: "http://127.0.0.1:0".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        sync_interval_secs: 3600,
        api_cache_ttl_secs: 3600,
    }
}

pub fn build_state(pool: PgPool, source: Arc<dyn MediaSource>) -> AppState {
    AppState {
        db: pool,
        cache: Arc::new(InMemoryCache::new()),
        instagram: source,
        config: test_config(),
    }
}

/// Build the application router the way `main.rs` does, minus the outer
/// middleware layers, with the media source replaced by a stub.
pub fn build_test_app(pool: PgPool, source: Arc<dyn MediaSource>) -> Router {
    build_router(build_state(pool, source))
}

pub fn ts(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
}

pub async fn seed_user(pool: &PgPool) -> Uuid {
    sqlx::query_scalar("INSERT INTO users (email) VALUES (NULL) RETURNING id")
        .fetch_one(pool)
        .await
        .expect("user insert should succeed")
}

pub async fn seed_token(pool: &PgPool, user_id: Uuid) {
    sqlx::query(
        "INSERT INTO social_tokens (user_id, provider, access_token)
         VALUES ($1, 'instagram', 'test-token')",
    )
    .bind(user_id)
    .execute(pool)
    .await
    .expect("token insert should succeed");
}

#[allow(clippy::too_many_arguments)]
pub async fn seed_record(
    pool: &PgPool,
    user_id: Uuid,
    instagram_id: i64,
    username: &str,
    license: &str,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO license_records
             (user_id, instagram_username, instagram_id, license, start_date, end_date)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id",
    )
    .bind(user_id)
    .bind(username)
    .bind(instagram_id)
    .bind(license)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await
    .expect("record insert should succeed")
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
