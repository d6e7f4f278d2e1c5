//! Instagram client — the single point of entry for all Instagram API calls.
//!
//! The sync engine never touches `reqwest` directly; it talks to the
//! `MediaSource` trait so tests can substitute a stub.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const API_VERSION_PATH: &str = "/v1";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum InstagramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One item of a recent-media response. Nested fields are all optional:
/// the API omits captions, images, and locations freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub caption: Option<Caption>,
    /// Unix seconds, transmitted as a string.
    pub created_time: Option<String>,
    pub filter: Option<String>,
    pub images: Option<ImageSet>,
    pub link: Option<String>,
    pub tags: Option<Value>,
    pub location: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caption {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSet {
    pub thumbnail: Option<ImageVersion>,
    pub standard_resolution: Option<ImageVersion>,
    pub low_resolution: Option<ImageVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageVersion {
    pub url: String,
}

impl MediaItem {
    /// Parses `created_time` (unix seconds as string) into a UTC timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let secs: i64 = self.created_time.as_deref()?.parse().ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }

    pub fn caption_text(&self) -> Option<&str> {
        self.caption.as_ref()?.text.as_deref()
    }

    pub fn image_url(&self, pick: fn(&ImageSet) -> Option<&ImageVersion>) -> Option<String> {
        self.images.as_ref().and_then(pick).map(|v| v.url.clone())
    }
}

#[derive(Debug, Deserialize)]
struct RecentMediaResponse {
    data: Value,
}

/// Source of recent media for an Instagram account. Implemented by the real
/// client and by test stubs.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fetches recent media for `instagram_id` bounded by unix-second
    /// timestamps. Returns the raw item array so callers can cache it
    /// verbatim.
    async fn recent_media(
        &self,
        instagram_id: i64,
        access_token: &str,
        max_timestamp: i64,
        min_timestamp: i64,
    ) -> Result<Value, InstagramError>;
}

#[derive(Clone)]
pub struct InstagramClient {
    client: Client,
    api_base: String,
}

impl InstagramClient {
    pub fn new(api_base: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaSource for InstagramClient {
    async fn recent_media(
        &self,
        instagram_id: i64,
        access_token: &str,
        max_timestamp: i64,
        min_timestamp: i64,
    ) -> Result<Value, InstagramError> {
        let url = format!(
            "{}{}/users/{}/media/recent",
            self.api_base, API_VERSION_PATH, instagram_id
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_token", access_token.to_string()),
                ("max_timestamp", max_timestamp.to_string()),
                ("min_timestamp", min_timestamp.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InstagramError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: RecentMediaResponse = response.json().await?;
        debug!(
            instagram_id,
            items = parsed.data.as_array().map(|a| a.len()).unwrap_or(0),
            "Fetched recent media"
        );
        Ok(parsed.data)
    }
}

/// Deserializes a raw item array, skipping entries that don't parse at all.
/// Items with missing nested fields still deserialize (everything inside is
/// optional) and are handled downstream.
pub fn parse_items(data: &Value) -> Vec<MediaItem> {
    match data.as_array() {
        Some(arr) => arr
            .iter()
            .filter_map(|v| match serde_json::from_value(v.clone()) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("Skipping unparseable media item: {e}");
                    None
                }
            })
            .collect(),
        None => Vec::new(),
    }
}
