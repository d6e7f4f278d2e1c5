//! Incremental photo sync against the Instagram API.
//!
//! Each pass walks the least-recently-synced license records (capped at 50),
//! pulls recent media inside each record's license window, and imports items
//! it has not seen before. Raw API responses are cached per account id so
//! repeated passes inside the TTL cost no API calls.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::get_access_token;
use crate::cache::ResponseCache;
use crate::errors::AppError;
use crate::instagram::{parse_items, ImageSet, MediaItem, MediaSource};
use crate::models::license::LicenseRecordRow;

/// Upper bound on records touched per sync pass; keeps API usage bounded.
pub const MAX_API_PER_GENERATION: i64 = 50;

fn cache_key(instagram_id: i64) -> String {
    format!("api_rc_{instagram_id}")
}

/// Outcome of one sync pass. API failures are captured per record rather
/// than aborting the pass, so one broken account cannot starve the rest.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub records_processed: usize,
    pub photos_imported: usize,
    pub failures: Vec<SyncFailure>,
}

#[derive(Debug, Serialize)]
pub struct SyncFailure {
    pub license_record_id: Uuid,
    pub instagram_username: Option<String>,
    pub error: String,
}

/// Strict import window: inside the license bounds and past the watermark.
/// The API is given the same bounds but violates them sometimes, so every
/// item is re-checked here.
pub fn in_window(
    created: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    watermark: DateTime<Utc>,
) -> bool {
    created < end && created > start && created > watermark
}

/// Filters API items down to the ones eligible for import.
pub fn plan_imports<'a>(
    items: &'a [MediaItem],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    watermark: DateTime<Utc>,
) -> Vec<&'a MediaItem> {
    items
        .iter()
        .filter(|item| match item.created_at() {
            Some(created) => in_window(created, start, end, watermark),
            None => false,
        })
        .collect()
}

/// Returns the cached item array for the account, or fetches and caches it.
/// The cache key is per account id only, so records sharing an account reuse
/// one response within the TTL regardless of their watermarks.
pub async fn fetch_recent(
    cache: &dyn ResponseCache,
    source: &dyn MediaSource,
    ttl: Duration,
    instagram_id: i64,
    access_token: &str,
    max_timestamp: i64,
    min_timestamp: i64,
) -> Result<Value, AppError> {
    let key = cache_key(instagram_id);
    if let Some(cached) = cache.get(&key).await? {
        debug!(instagram_id, "Using cached API response");
        return Ok(cached);
    }

    let data = source
        .recent_media(instagram_id, access_token, max_timestamp, min_timestamp)
        .await
        .map_err(|e| AppError::Instagram(e.to_string()))?;

    cache.set(&key, &data, ttl).await?;
    Ok(data)
}

/// Runs one sync pass, optionally scoped to a single Instagram username.
pub async fn sync_photos(
    pool: &PgPool,
    source: &dyn MediaSource,
    cache: &dyn ResponseCache,
    cache_ttl: Duration,
    username: Option<&str>,
) -> Result<SyncReport, AppError> {
    // last_used_in_api orders records so the stalest accounts go first;
    // NULLS FIRST means never-synced records win.
    let records: Vec<LicenseRecordRow> = sqlx::query_as(
        "SELECT * FROM license_records
         WHERE end_date IS NOT NULL
           AND ($1::text IS NULL OR instagram_username = $1)
         ORDER BY last_used_in_api ASC NULLS FIRST
         LIMIT $2",
    )
    .bind(username)
    .bind(MAX_API_PER_GENERATION)
    .fetch_all(pool)
    .await?;

    let mut report = SyncReport::default();

    for record in &records {
        match sync_record(pool, source, cache, cache_ttl, record).await {
            Ok(imported) => {
                report.records_processed += 1;
                report.photos_imported += imported;
                touch_record(pool, record.id).await?;
            }
            Err(e) => {
                // Bookkeeping deliberately untouched so the record sorts
                // first on the next pass.
                warn!(
                    record_id = %record.id,
                    username = record.instagram_username.as_deref().unwrap_or("?"),
                    "Sync failed for record: {e}"
                );
                report.failures.push(SyncFailure {
                    license_record_id: record.id,
                    instagram_username: record.instagram_username.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    if report.photos_imported > 0 || !report.failures.is_empty() {
        info!(
            records = report.records_processed,
            imported = report.photos_imported,
            failed = report.failures.len(),
            "Sync pass finished"
        );
    }
    Ok(report)
}

async fn sync_record(
    pool: &PgPool,
    source: &dyn MediaSource,
    cache: &dyn ResponseCache,
    cache_ttl: Duration,
    record: &LicenseRecordRow,
) -> Result<usize, AppError> {
    // end_date IS NOT NULL is guaranteed by the selection query.
    let end = record
        .end_date
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("record selected without end_date")))?;

    let latest_photo: Option<DateTime<Utc>> = sqlx::query_scalar(
        "SELECT created_time FROM photos
         WHERE license_record_id = $1
         ORDER BY created_time DESC LIMIT 1",
    )
    .bind(record.id)
    .fetch_optional(pool)
    .await?;

    let Some(start) = record.start_date else {
        // Stopped draft: bounded but never activated, nothing to sync.
        debug!(record_id = %record.id, "Skipping record with no start_date");
        return Ok(0);
    };
    let watermark = latest_photo.unwrap_or(start);

    let token = get_access_token(pool, record.user_id).await?;
    let data = fetch_recent(
        cache,
        source,
        cache_ttl,
        record.instagram_id,
        &token,
        end.timestamp(),
        watermark.timestamp(),
    )
    .await?;

    let items = parse_items(&data);
    let mut imported = 0;
    for item in plan_imports(&items, start, end, watermark) {
        if import_photo(pool, record.id, item).await? {
            imported += 1;
        }
    }

    Ok(imported)
}

/// Inserts the photo unless its external id is already stored.
/// Returns whether a row was actually written.
async fn import_photo(
    pool: &PgPool,
    license_record_id: Uuid,
    item: &MediaItem,
) -> Result<bool, AppError> {
    let created = item
        .created_at()
        .ok_or_else(|| AppError::Instagram(format!("item {} has no created_time", item.id)))?;

    let result = sqlx::query(
        "INSERT INTO photos
             (license_record_id, photo_id, caption, created_time, filter,
              image_thumbnail, image_standard_resolution, image_low_resolution,
              link, tags, location)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (photo_id) DO NOTHING",
    )
    .bind(license_record_id)
    .bind(&item.id)
    .bind(item.caption_text())
    .bind(created)
    .bind(&item.filter)
    .bind(item.image_url(|i: &ImageSet| i.thumbnail.as_ref()))
    .bind(item.image_url(|i: &ImageSet| i.standard_resolution.as_ref()))
    .bind(item.image_url(|i: &ImageSet| i.low_resolution.as_ref()))
    .bind(&item.link)
    .bind(&item.tags)
    .bind(&item.location)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn touch_record(pool: &PgPool, record_id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE license_records SET last_used_in_api = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(record_id)
        .execute(pool)
        .await?;
    Ok(())
}
