use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::licensing::form::{
    apply_submission, current_record, stop_licensing, LicenseSubmission, LICENSE_TERM_WEEKS,
};
use crate::models::license::{License, LicenseRecordRow};
use crate::models::photo::PhotoRow;
use crate::state::AppState;
use crate::sync::handlers::spawn_refresh;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct LicenseView {
    #[serde(flatten)]
    pub record: LicenseRecordRow,
    pub license_full_name: Option<&'static str>,
    pub license_url: Option<&'static str>,
    /// What `end_date` would become if the form were submitted now.
    pub renewal_end_date: DateTime<Utc>,
}

impl LicenseView {
    fn from_record(record: LicenseRecordRow) -> Self {
        let license_full_name = record.license_full_name();
        let license_url = record.license_url();
        LicenseView {
            record,
            license_full_name,
            license_url,
            renewal_end_date: Utc::now() + Duration::weeks(LICENSE_TERM_WEEKS),
        }
    }
}

/// GET /api/v1/license
pub async fn handle_get_license(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<LicenseView>, AppError> {
    let record = current_record(&state.db, params.user_id).await?;
    Ok(Json(LicenseView::from_record(record)))
}

/// The license kind arrives as a plain string so an unknown value surfaces
/// as our validation error, not a deserialization rejection.
#[derive(Deserialize)]
pub struct SubmitLicenseRequest {
    pub user_id: Uuid,
    pub license: String,
    pub full_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub old_photos: bool,
}

impl SubmitLicenseRequest {
    fn to_submission(&self) -> Result<LicenseSubmission, AppError> {
        let license = License::parse(&self.license).ok_or_else(|| {
            AppError::Validation(format!("Unknown license kind: {}", self.license))
        })?;
        Ok(LicenseSubmission {
            license,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            old_photos: self.old_photos,
        })
    }
}

/// POST /api/v1/license
pub async fn handle_submit_license(
    State(state): State<AppState>,
    Json(req): Json<SubmitLicenseRequest>,
) -> Result<Json<LicenseView>, AppError> {
    let submission = req.to_submission()?;
    let record = current_record(&state.db, req.user_id).await?;
    let saved = apply_submission(&state.db, &record, &submission, Utc::now()).await?;
    Ok(Json(LicenseView::from_record(saved)))
}

/// POST /api/v1/license/stop
pub async fn handle_stop_license(
    State(state): State<AppState>,
    Json(req): Json<UserIdQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = current_record(&state.db, req.user_id).await?;
    stop_licensing(&state.db, &record, Utc::now()).await?;
    Ok(Json(serde_json::json!({ "stopped": true })))
}

#[derive(Deserialize)]
pub struct LicenseListFilter {
    pub instagram_username: Option<String>,
    pub license: Option<String>,
    pub full_name: Option<String>,
}

/// GET /api/v1/licenses
///
/// Filterable listing over license records.
pub async fn handle_list_licenses(
    State(state): State<AppState>,
    Query(filter): Query<LicenseListFilter>,
) -> Result<Json<Vec<LicenseView>>, AppError> {
    if let Some(kind) = &filter.license {
        if License::parse(kind).is_none() {
            return Err(AppError::Validation(format!("Unknown license kind: {kind}")));
        }
    }

    let records: Vec<LicenseRecordRow> = sqlx::query_as(
        "SELECT * FROM license_records
         WHERE ($1::text IS NULL OR instagram_username = $1)
           AND ($2::text IS NULL OR license = $2)
           AND ($3::text IS NULL OR full_name = $3)
         ORDER BY created_at DESC",
    )
    .bind(&filter.instagram_username)
    .bind(&filter.license)
    .bind(&filter.full_name)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(records.into_iter().map(LicenseView::from_record).collect()))
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub licenses: Vec<LicenseView>,
    pub num_users: i64,
    pub recent_photos: Vec<PhotoRow>,
}

/// GET /api/v1/index
///
/// Front-page data: the 50 most recently bounded records, the distinct
/// licensed-user count, and the 50 newest photos.
pub async fn handle_index(State(state): State<AppState>) -> Result<Json<IndexResponse>, AppError> {
    spawn_refresh(&state, None);

    let records: Vec<LicenseRecordRow> = sqlx::query_as(
        "SELECT * FROM license_records
         WHERE end_date IS NOT NULL
         ORDER BY end_date DESC LIMIT 50",
    )
    .fetch_all(&state.db)
    .await?;

    let num_users: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM license_records")
            .fetch_one(&state.db)
            .await?;

    let recent_photos: Vec<PhotoRow> =
        sqlx::query_as("SELECT * FROM photos ORDER BY created_time DESC LIMIT 50")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(IndexResponse {
        licenses: records.into_iter().map(LicenseView::from_record).collect(),
        num_users,
        recent_photos,
    }))
}
