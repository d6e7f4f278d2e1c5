//! License submission validation and the versioning rule.
//!
//! Changing the license kind on an already-activated record must not rewrite
//! history: the old record is closed and a new one opened, so which license
//! applied when stays reconstructable. The decision itself is a pure
//! comparison; persistence happens in `apply_submission`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::license::{License, LicenseRecordRow};

/// Every submission renews the license for this long.
pub const LICENSE_TERM_WEEKS: i64 = 12;

/// Instagram launched in October 2010; backdating to just before that makes
/// every photo the account ever posted eligible for sync.
pub fn instagram_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2010, 9, 1, 0, 0, 0).unwrap()
}

/// A user's license form submission.
#[derive(Debug, Clone, Deserialize)]
pub struct LicenseSubmission {
    pub license: License,
    pub full_name: Option<String>,
    pub email: String,
    /// "Apply to photos taken before this license."
    #[serde(default)]
    pub old_photos: bool,
}

/// Outcome of the pure versioning decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseAction {
    /// Mutate the existing record in place (drafts, and resubmission of the
    /// same kind).
    UpdateExisting,
    /// Close the existing record and open a new one with the submitted kind.
    Rotate,
}

/// Decides whether a submission updates the record in place or rotates it.
/// Rotation happens only when the record was previously activated and the
/// submitted kind differs from the stored one.
pub fn plan_license_change(
    start_date: Option<DateTime<Utc>>,
    stored: &str,
    submitted: License,
) -> LicenseAction {
    if start_date.is_some() && stored != submitted.as_str() {
        LicenseAction::Rotate
    } else {
        LicenseAction::UpdateExisting
    }
}

/// Computes the activation start for the record being saved. Backdating wins
/// over everything; otherwise an absent start becomes `now`.
pub fn resolve_start_date(
    current: Option<DateTime<Utc>>,
    old_photos: bool,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if old_photos {
        instagram_epoch()
    } else {
        current.unwrap_or(now)
    }
}

/// Validates and persists a license submission against `record`.
///
/// Side effects, in order: the user's email is written immediately (not
/// atomic with the rest, preserved behavior); on a kind change of an
/// activated record the old row is closed at `now` and a fresh row opened;
/// the saved record always ends up with `end_date = now + 12 weeks`.
pub async fn apply_submission(
    pool: &PgPool,
    record: &LicenseRecordRow,
    submission: &LicenseSubmission,
    now: DateTime<Utc>,
) -> Result<LicenseRecordRow, AppError> {
    sqlx::query("UPDATE users SET email = $1 WHERE id = $2")
        .bind(&submission.email)
        .bind(record.user_id)
        .execute(pool)
        .await?;

    let action = plan_license_change(record.start_date, &record.license, submission.license);

    let full_name = submission
        .full_name
        .as_deref()
        .or(record.full_name.as_deref());
    let end_date = now + Duration::weeks(LICENSE_TERM_WEEKS);

    let saved: LicenseRecordRow = match action {
        LicenseAction::Rotate => {
            sqlx::query("UPDATE license_records SET end_date = $1 WHERE id = $2")
                .bind(now)
                .bind(record.id)
                .execute(pool)
                .await?;
            info!(
                record_id = %record.id,
                old_license = %record.license,
                new_license = submission.license.as_str(),
                "License kind changed; rotating record"
            );

            let start_date = resolve_start_date(Some(now), submission.old_photos, now);
            sqlx::query_as(
                "INSERT INTO license_records
                     (user_id, instagram_username, instagram_id, full_name, avatar_url,
                      website, license, start_date, end_date)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 RETURNING *",
            )
            .bind(record.user_id)
            .bind(&record.instagram_username)
            .bind(record.instagram_id)
            .bind(full_name)
            .bind(&record.avatar_url)
            .bind(&record.website)
            .bind(submission.license.as_str())
            .bind(start_date)
            .bind(end_date)
            .fetch_one(pool)
            .await?
        }
        LicenseAction::UpdateExisting => {
            let start_date = resolve_start_date(record.start_date, submission.old_photos, now);
            sqlx::query_as(
                "UPDATE license_records
                 SET license = $1, full_name = $2, start_date = $3, end_date = $4
                 WHERE id = $5
                 RETURNING *",
            )
            .bind(submission.license.as_str())
            .bind(full_name)
            .bind(start_date)
            .bind(end_date)
            .bind(record.id)
            .fetch_one(pool)
            .await?
        }
    };

    Ok(saved)
}

/// Closes the record at `now` and deletes the user's sessions (logout).
pub async fn stop_licensing(
    pool: &PgPool,
    record: &LicenseRecordRow,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE license_records SET end_date = $1 WHERE id = $2")
        .bind(now)
        .bind(record.id)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(record.user_id)
        .execute(pool)
        .await?;

    info!(record_id = %record.id, "Licensing stopped, sessions cleared");
    Ok(())
}

/// The record a user's submission targets: the in-progress record if one
/// exists, else the most recent by `end_date`.
pub async fn current_record(pool: &PgPool, user_id: Uuid) -> Result<LicenseRecordRow, AppError> {
    let in_progress: Option<LicenseRecordRow> = sqlx::query_as(
        "SELECT * FROM license_records WHERE user_id = $1 AND end_date IS NULL LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    if let Some(record) = in_progress {
        return Ok(record);
    }

    let most_recent: Option<LicenseRecordRow> = sqlx::query_as(
        "SELECT * FROM license_records
         WHERE user_id = $1 AND end_date IS NOT NULL
         ORDER BY end_date DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    most_recent.ok_or_else(|| AppError::NotFound(format!("No license record for user {user_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_never_rotates() {
        // No start_date means the record was never activated
        assert_eq!(
            plan_license_change(None, "CC-BY", License::Cc0),
            LicenseAction::UpdateExisting
        );
    }

    #[test]
    fn test_activated_kind_change_rotates() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            plan_license_change(Some(start), "CC-BY", License::Cc0),
            LicenseAction::Rotate
        );
    }

    #[test]
    fn test_same_kind_resubmission_updates_in_place() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            plan_license_change(Some(start), "CC-BY", License::CcBy),
            LicenseAction::UpdateExisting
        );
    }

    #[test]
    fn test_old_photos_backdates_to_epoch() {
        let now = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(resolve_start_date(Some(now), true, now), instagram_epoch());
        assert_eq!(resolve_start_date(None, true, now), instagram_epoch());
    }

    #[test]
    fn test_absent_start_becomes_now() {
        let now = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(resolve_start_date(None, false, now), now);
    }

    #[test]
    fn test_existing_start_is_kept() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(resolve_start_date(Some(start), false, now), start);
    }
}
