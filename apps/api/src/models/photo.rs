use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A CC-licensed Instagram photo owned by one license record.
///
/// Mirrors the Instagram API item it was imported from. `photo_id` is the
/// external id and is globally unique: a photo already present is never
/// re-imported or updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PhotoRow {
    pub id: Uuid,
    pub license_record_id: Uuid,
    pub photo_id: String,
    pub caption: Option<String>,
    pub created_time: DateTime<Utc>,
    pub filter: Option<String>,
    pub image_thumbnail: Option<String>,
    pub image_standard_resolution: Option<String>,
    pub image_low_resolution: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Value>,
    pub location: Option<Value>,
    pub created_at: DateTime<Utc>,
}
