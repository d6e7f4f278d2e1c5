use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ccgram_api::cache::{InMemoryCache, RedisCache, ResponseCache};
use ccgram_api::config::Config;
use ccgram_api::db::{create_pool, run_migrations};
use ccgram_api::instagram::{InstagramClient, MediaSource};
use ccgram_api::routes::build_router;
use ccgram_api::state::AppState;
use ccgram_api::sync;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("ccgram_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ccgram API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // API-response cache: Redis when configured, in-process otherwise
    let cache: Arc<dyn ResponseCache> = match &config.redis_url {
        Some(url) => {
            info!("Using Redis response cache");
            Arc::new(RedisCache::new(url)?)
        }
        None => {
            info!("REDIS_URL not set; using in-memory response cache");
            Arc::new(InMemoryCache::new())
        }
    };

    // Instagram client
    let instagram: Arc<dyn MediaSource> =
        Arc::new(InstagramClient::new(config.instagram_api_base.clone()));
    info!("Instagram client initialized (base: {})", config.instagram_api_base);

    // Build app state
    let state = AppState {
        db,
        cache,
        instagram,
        config: config.clone(),
    };

    // Background sync loop keeps the photo store fresh between requests
    tokio::spawn(sync::background::run(state.clone()));

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
