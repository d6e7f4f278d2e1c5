use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::instagram::MediaSource;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// API-response cache injected into the sync engine. Redis in production,
    /// in-memory when no REDIS_URL is configured.
    pub cache: Arc<dyn ResponseCache>,
    pub instagram: Arc<dyn MediaSource>,
    pub config: Config,
}
