pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth;
use crate::licensing::handlers as licensing;
use crate::photos;
use crate::state::AppState;
use crate::sync::handlers as sync;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Licensing
        .route("/api/v1/index", get(licensing::handle_index))
        .route(
            "/api/v1/license",
            get(licensing::handle_get_license).post(licensing::handle_submit_license),
        )
        .route("/api/v1/license/stop", post(licensing::handle_stop_license))
        .route("/api/v1/licenses", get(licensing::handle_list_licenses))
        // Auth callback
        .route(
            "/api/v1/auth/instagram/callback",
            post(auth::handle_callback),
        )
        // Photos
        .route("/api/v1/photos", get(photos::handle_recent_photos))
        .route("/api/v1/photos/:username", get(photos::handle_user_photos))
        .route(
            "/api/v1/photos/:username/:photo_id",
            get(photos::handle_photo_page),
        )
        // Sync
        .route("/api/v1/sync", post(sync::handle_sync))
        .with_state(state)
}
