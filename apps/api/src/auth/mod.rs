//! Consumes the Instagram OAuth callback contract. The OAuth dance itself
//! happens elsewhere; this module receives the resulting profile + token,
//! links them to a license record, and opens a session.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::license::LicenseRecordRow;
use crate::state::AppState;

pub const PROVIDER: &str = "instagram";

/// Profile details delivered by the auth provider on login.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderProfile {
    pub username: String,
    /// The platform's numeric account id.
    pub instagram_id: i64,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub user_id: Uuid,
    pub access_token: String,
    pub profile: ProviderProfile,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub session_id: Uuid,
    pub license_record_id: Uuid,
}

/// POST /api/v1/auth/instagram/callback
///
/// Stores the granted token (append-only, most recent wins), refreshes the
/// user's current license record without cloning an active one, and opens a
/// session.
pub async fn handle_callback(
    State(state): State<AppState>,
    Json(req): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, AppError> {
    // First login creates the user row; email arrives later with the form
    sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
        .bind(req.user_id)
        .execute(&state.db)
        .await?;

    store_access_token(&state.db, req.user_id, &req.access_token).await?;

    let record = link_profile(&state.db, req.user_id, &req.profile).await?;

    let session_id: Uuid =
        sqlx::query_scalar("INSERT INTO sessions (user_id) VALUES ($1) RETURNING id")
            .bind(req.user_id)
            .fetch_one(&state.db)
            .await?;

    info!(
        user_id = %req.user_id,
        record_id = %record.id,
        username = %req.profile.username,
        "Instagram login linked"
    );

    Ok(Json(CallbackResponse {
        session_id,
        license_record_id: record.id,
    }))
}

async fn store_access_token(pool: &PgPool, user_id: Uuid, token: &str) -> Result<(), AppError> {
    sqlx::query("INSERT INTO social_tokens (user_id, provider, access_token) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(PROVIDER)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Returns the most recently granted access token for the user.
pub async fn get_access_token(pool: &PgPool, user_id: Uuid) -> Result<String, AppError> {
    let token: Option<String> = sqlx::query_scalar(
        "SELECT access_token FROM social_tokens
         WHERE user_id = $1 AND provider = $2
         ORDER BY id DESC LIMIT 1",
    )
    .bind(user_id)
    .bind(PROVIDER)
    .fetch_optional(pool)
    .await?;

    token.ok_or_else(|| AppError::NotFound(format!("No access token for user {user_id}")))
}

/// Picks (or creates) the record a fresh login should refresh:
/// a still-active record first, then a draft, then a brand-new record when
/// the previous one expired. Profile fields are updated in place either way,
/// so a subsequent login never clones an active record.
async fn link_profile(
    pool: &PgPool,
    user_id: Uuid,
    profile: &ProviderProfile,
) -> Result<LicenseRecordRow, AppError> {
    let now = Utc::now();

    let active: Option<LicenseRecordRow> = sqlx::query_as(
        "SELECT * FROM license_records
         WHERE user_id = $1 AND end_date >= $2
         ORDER BY end_date DESC LIMIT 1",
    )
    .bind(user_id)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    let existing = match active {
        Some(record) => Some(record),
        None => {
            // Partially-filled-out form from before
            sqlx::query_as(
                "SELECT * FROM license_records
                 WHERE user_id = $1 AND start_date IS NULL LIMIT 1",
            )
            .bind(user_id)
            .fetch_optional(pool)
            .await?
        }
    };

    let full_name = profile
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&profile.username);

    let record: LicenseRecordRow = match existing {
        Some(record) => {
            sqlx::query_as(
                "UPDATE license_records
                 SET instagram_username = $1, instagram_id = $2, full_name = $3,
                     avatar_url = $4, website = $5
                 WHERE id = $6
                 RETURNING *",
            )
            .bind(&profile.username)
            .bind(profile.instagram_id)
            .bind(full_name)
            .bind(&profile.avatar_url)
            .bind(&profile.website)
            .bind(record.id)
            .fetch_one(pool)
            .await?
        }
        None => {
            // Previous record expired (or first login): open a fresh one
            sqlx::query_as(
                "INSERT INTO license_records
                     (user_id, instagram_username, instagram_id, full_name, avatar_url, website)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING *",
            )
            .bind(user_id)
            .bind(&profile.username)
            .bind(profile.instagram_id)
            .bind(full_name)
            .bind(&profile.avatar_url)
            .bind(&profile.website)
            .fetch_one(pool)
            .await?
        }
    };

    Ok(record)
}
