//! Integration tests for the license lifecycle: rotation on a kind change,
//! in-place renewal, and submission validation over HTTP.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{body_json, build_test_app, post_json, seed_record, seed_user, ts, StubSource};
use serde_json::json;
use sqlx::PgPool;

use ccgram_api::licensing::form::{
    apply_submission, current_record, LicenseSubmission, LICENSE_TERM_WEEKS,
};
use ccgram_api::models::license::{License, LicenseRecordRow};

async fn all_records(pool: &PgPool, user: uuid::Uuid) -> Vec<LicenseRecordRow> {
    sqlx::query_as("SELECT * FROM license_records WHERE user_id = $1 ORDER BY created_at")
        .bind(user)
        .fetch_all(pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Test: changing the kind of an activated record produces two records
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn kind_change_rotates_activated_record(pool: PgPool) {
    let user = seed_user(&pool).await;
    let start = ts(2021, 1, 1);
    seed_record(&pool, user, 42, "alice", "CC-BY", Some(start), Some(ts(2021, 4, 1))).await;

    let record = current_record(&pool, user).await.unwrap();
    let now = ts(2021, 2, 1);
    let submission = LicenseSubmission {
        license: License::Cc0,
        full_name: None,
        email: "alice@example.com".to_string(),
        old_photos: false,
    };

    let saved = apply_submission(&pool, &record, &submission, now)
        .await
        .expect("submission should succeed");

    let rows = all_records(&pool, user).await;
    assert_eq!(rows.len(), 2);

    let old = rows.iter().find(|r| r.id == record.id).unwrap();
    let new = rows.iter().find(|r| r.id != record.id).unwrap();

    // Old record closed at now, untouched otherwise
    assert_eq!(old.license, "CC-BY");
    assert_eq!(old.end_date, Some(now));
    assert_eq!(old.start_date, Some(start));

    // New record opened at now with the submitted kind and a fresh window
    assert_eq!(new.license, "CC0");
    assert_eq!(new.start_date, Some(now));
    assert_eq!(new.end_date, Some(now + Duration::weeks(LICENSE_TERM_WEEKS)));
    assert_eq!(saved.id, new.id);

    // Email side effect lands on the user row
    let email: Option<String> = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
        .bind(user)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(email.as_deref(), Some("alice@example.com"));
}

// ---------------------------------------------------------------------------
// Test: resubmitting the same kind renews the window in place
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn same_kind_renews_in_place(pool: PgPool) {
    let user = seed_user(&pool).await;
    let start = ts(2021, 1, 1);
    seed_record(&pool, user, 42, "alice", "CC-BY", Some(start), Some(ts(2021, 4, 1))).await;

    let record = current_record(&pool, user).await.unwrap();
    let now = ts(2021, 2, 1);
    let submission = LicenseSubmission {
        license: License::CcBy,
        full_name: Some("Alice".to_string()),
        email: "alice@example.com".to_string(),
        old_photos: false,
    };

    let saved = apply_submission(&pool, &record, &submission, now)
        .await
        .expect("submission should succeed");

    let rows = all_records(&pool, user).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(saved.id, record.id);
    assert_eq!(rows[0].start_date, Some(start));
    assert_eq!(rows[0].end_date, Some(now + Duration::weeks(LICENSE_TERM_WEEKS)));
}

// ---------------------------------------------------------------------------
// Test: an unknown license kind is our 400, not an extractor rejection
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn unknown_kind_returns_validation_error(pool: PgPool) {
    let user = seed_user(&pool).await;
    let source = StubSource::new(json!([]));
    let app = build_test_app(pool.clone(), source);

    let response = post_json(
        app,
        "/api/v1/license",
        json!({
            "user_id": user,
            "license": "CC-EVERYTHING",
            "email": "alice@example.com"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
