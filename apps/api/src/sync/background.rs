//! Periodic unscoped sync pass.
//!
//! Runs on a fixed interval using `tokio::time::interval`; read paths stay
//! pure queries while this loop keeps the photo store converging.

use std::time::Duration;

use tracing::{error, info};

use crate::state::AppState;
use crate::sync::engine::sync_photos;

pub async fn run(state: AppState) {
    let interval_secs = state.config.sync_interval_secs;
    let cache_ttl = Duration::from_secs(state.config.api_cache_ttl_secs);

    info!(interval_secs, "Background sync loop started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // First tick fires immediately; skip it so startup isn't blocked on the
    // external API.
    interval.tick().await;

    loop {
        interval.tick().await;
        match sync_photos(
            &state.db,
            state.instagram.as_ref(),
            state.cache.as_ref(),
            cache_ttl,
            None,
        )
        .await
        {
            Ok(report) => {
                if report.photos_imported > 0 {
                    info!(
                        imported = report.photos_imported,
                        records = report.records_processed,
                        "Background sync imported new photos"
                    );
                }
            }
            Err(e) => {
                error!("Background sync pass failed: {e}");
            }
        }
    }
}
