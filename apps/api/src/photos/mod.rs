//! Read paths over licensed photos.
//!
//! Listings are pure queries; each one also kicks off a non-blocking refresh
//! scoped the same way, so the store converges without coupling response
//! latency to the external API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::license::LicenseRecordRow;
use crate::models::photo::PhotoRow;
use crate::state::AppState;
use crate::sync::handlers::spawn_refresh;

const DEFAULT_LIMIT: i64 = 50;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct UserPhotosResponse {
    pub info: LicenseRecordRow,
    pub photos: Vec<PhotoRow>,
}

/// GET /api/v1/photos
pub async fn handle_recent_photos(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<PhotoRow>>, AppError> {
    spawn_refresh(&state, None);

    let photos: Vec<PhotoRow> =
        sqlx::query_as("SELECT * FROM photos ORDER BY created_time DESC LIMIT $1")
            .bind(params.limit.unwrap_or(DEFAULT_LIMIT))
            .fetch_all(&state.db)
            .await?;
    Ok(Json(photos))
}

/// GET /api/v1/photos/:username
pub async fn handle_user_photos(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<ListQuery>,
) -> Result<Json<UserPhotosResponse>, AppError> {
    let info: Option<LicenseRecordRow> = sqlx::query_as(
        "SELECT * FROM license_records
         WHERE instagram_username = $1
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(&username)
    .fetch_optional(&state.db)
    .await?;

    let info = info.ok_or_else(|| AppError::NotFound(format!("No license for @{username}")))?;

    spawn_refresh(&state, Some(username.clone()));

    // Photos across all of the user's bounded records, newest first
    let photos: Vec<PhotoRow> = sqlx::query_as(
        "SELECT p.* FROM photos p
         JOIN license_records r ON r.id = p.license_record_id
         WHERE r.instagram_username = $1 AND r.end_date IS NOT NULL
         ORDER BY p.created_time DESC LIMIT $2",
    )
    .bind(&username)
    .bind(params.limit.unwrap_or(DEFAULT_LIMIT))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(UserPhotosResponse { info, photos }))
}

#[derive(Serialize)]
pub struct PhotoPageResponse {
    pub photo: PhotoRow,
    pub info: LicenseRecordRow,
}

/// GET /api/v1/photos/:username/:photo_id
pub async fn handle_photo_page(
    State(state): State<AppState>,
    Path((username, photo_id)): Path<(String, Uuid)>,
) -> Result<Json<PhotoPageResponse>, AppError> {
    let photo: Option<PhotoRow> = sqlx::query_as("SELECT * FROM photos WHERE id = $1")
        .bind(photo_id)
        .fetch_optional(&state.db)
        .await?;

    let photo = photo.ok_or_else(|| AppError::NotFound(format!("Photo {photo_id} not found")))?;

    let info: LicenseRecordRow =
        sqlx::query_as("SELECT * FROM license_records WHERE id = $1")
            .bind(photo.license_record_id)
            .fetch_one(&state.db)
            .await?;

    if info.instagram_username.as_deref() != Some(username.as_str()) {
        return Err(AppError::NotFound(format!(
            "Photo {photo_id} does not belong to @{username}"
        )));
    }

    Ok(Json(PhotoPageResponse { photo, info }))
}
