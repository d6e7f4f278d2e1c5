use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Optional: when unset the service falls back to the in-process cache.
    pub redis_url: Option<String>,
    pub instagram_api_base: String,
    pub port: u16,
    pub rust_log: String,
    /// Interval between unscoped background sync passes.
    pub sync_interval_secs: u64,
    /// TTL for cached Instagram API responses.
    pub api_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: std::env::var("REDIS_URL").ok(),
            instagram_api_base: std::env::var("INSTAGRAM_API_BASE")
                .unwrap_or_else(|_| "https://api.instagram.com".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            sync_interval_secs: std::env::var("SYNC_INTERVAL_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse::<u64>()
                .context("SYNC_INTERVAL_SECS must be a number of seconds")?,
            api_cache_ttl_secs: std::env::var("API_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse::<u64>()
                .context("API_CACHE_TTL_SECS must be a number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
