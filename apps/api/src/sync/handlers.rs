use std::time::Duration;

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::state::AppState;
use crate::sync::engine::{sync_photos, SyncReport};

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// Restrict the pass to one Instagram username.
    pub username: Option<String>,
}

/// POST /api/v1/sync
///
/// Runs a sync pass inline and reports what happened, including per-record
/// failures that a background pass would only log.
pub async fn handle_sync(
    State(state): State<AppState>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<SyncReport>, AppError> {
    let report = sync_photos(
        &state.db,
        state.instagram.as_ref(),
        state.cache.as_ref(),
        Duration::from_secs(state.config.api_cache_ttl_secs),
        req.username.as_deref(),
    )
    .await?;
    Ok(Json(report))
}

/// Spawns a non-blocking sync pass; used by read paths so listing photos
/// never waits on the external API.
pub fn spawn_refresh(state: &AppState, username: Option<String>) {
    let state = state.clone();
    tokio::spawn(async move {
        let result = sync_photos(
            &state.db,
            state.instagram.as_ref(),
            state.cache.as_ref(),
            Duration::from_secs(state.config.api_cache_ttl_secs),
            username.as_deref(),
        )
        .await;
        if let Err(e) = result {
            tracing::warn!("Read-triggered refresh failed: {e}");
        }
    });
}
