use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;

use crate::errors::AppError;

/// Key/value cache with per-entry TTL, injected into the sync engine.
///
/// Two concurrent requests for the same key can race on population; last
/// writer wins. The cached value is advisory (a rate-limit aid), so the race
/// has no correctness impact.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError>;
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), AppError>;
}

/// In-process cache backed by a mutexed map. Used in tests and in deployments
/// without Redis.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Cache("in-memory cache lock poisoned".to_string()))?;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), AppError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Cache("in-memory cache lock poisoned".to_string()))?;
        entries.insert(key.to_string(), (value.clone(), Instant::now() + ttl));
        Ok(())
    }
}

/// Redis-backed cache for multi-process deployments. Values are stored as
/// JSON strings with `SET ... EX`.
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Cache(format!("invalid Redis URL: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Cache(format!("Redis connection failed: {e}")))?;
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| AppError::Cache(format!("Redis GET failed: {e}")))?;
        match raw {
            Some(s) => serde_json::from_str(&s)
                .map(Some)
                .map_err(|e| AppError::Cache(format!("corrupt cache entry for {key}: {e}"))),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Cache(format!("Redis connection failed: {e}")))?;
        let raw = serde_json::to_string(value)
            .map_err(|e| AppError::Cache(format!("cache serialization failed: {e}")))?;
        conn.set_ex::<_, _, ()>(key, raw, ttl.as_secs())
            .await
            .map_err(|e| AppError::Cache(format!("Redis SET failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_returns_stored_value() {
        let cache = InMemoryCache::new();
        cache
            .set("api_rc_42", &json!([{"id": "1"}]), Duration::from_secs(60))
            .await
            .unwrap();
        let got = cache.get("api_rc_42").await.unwrap();
        assert_eq!(got, Some(json!([{"id": "1"}])));
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let cache = InMemoryCache::new();
        cache
            .set("api_rc_42", &json!([]), Duration::from_secs(0))
            .await
            .unwrap();
        assert_eq!(cache.get("api_rc_42").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("api_rc_7").await.unwrap(), None);
    }
}
