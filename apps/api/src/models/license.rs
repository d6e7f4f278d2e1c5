use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The seven Creative Commons license kinds a user can pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum License {
    #[serde(rename = "CC0")]
    Cc0,
    #[serde(rename = "CC-BY")]
    CcBy,
    #[serde(rename = "CC-BY-SA")]
    CcBySa,
    #[serde(rename = "CC-BY-NC")]
    CcByNc,
    #[serde(rename = "CC-BY-ND")]
    CcByNd,
    #[serde(rename = "CC-BY-NC-SA")]
    CcByNcSa,
    #[serde(rename = "CC-BY-NC-ND")]
    CcByNcNd,
}

impl License {
    pub const ALL: [License; 7] = [
        License::Cc0,
        License::CcBy,
        License::CcBySa,
        License::CcByNc,
        License::CcByNd,
        License::CcByNcSa,
        License::CcByNcNd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            License::Cc0 => "CC0",
            License::CcBy => "CC-BY",
            License::CcBySa => "CC-BY-SA",
            License::CcByNc => "CC-BY-NC",
            License::CcByNd => "CC-BY-ND",
            License::CcByNcSa => "CC-BY-NC-SA",
            License::CcByNcNd => "CC-BY-NC-ND",
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            License::Cc0 => "Creative Commons Public Domain",
            License::CcBy => "Creative Commons Attribution",
            License::CcBySa => "Creative Commons Attribution-ShareAlike",
            License::CcByNc => "Creative Commons Attribution-NonCommercial",
            License::CcByNd => "Creative Commons Attribution-NoDerivs",
            License::CcByNcSa => "Creative Commons Attribution-NonCommercial-ShareAlike",
            License::CcByNcNd => "Creative Commons Attribution-NonCommercial-NoDerivs",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            License::Cc0 => "http://creativecommons.org/publicdomain/zero/1.0/",
            License::CcBy => "http://creativecommons.org/licenses/by/3.0/",
            License::CcBySa => "http://creativecommons.org/licenses/by-sa/3.0/",
            License::CcByNc => "http://creativecommons.org/licenses/by-nc/3.0/",
            License::CcByNd => "http://creativecommons.org/licenses/by-nd/3.0/",
            License::CcByNcSa => "http://creativecommons.org/licenses/by-nc-sa/3.0/",
            License::CcByNcNd => "http://creativecommons.org/licenses/by-nc-nd/3.0/",
        }
    }

    pub fn parse(s: &str) -> Option<License> {
        License::ALL.iter().copied().find(|l| l.as_str() == s)
    }
}

/// A time-bounded declaration of which CC license applies to a user's photos.
///
/// At most one record per user has `end_date = NULL` (the in-progress one).
/// A record with no `start_date` is a draft and is edited in place until
/// activated; activated records are rotated, never rewritten, on a license
/// kind change.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LicenseRecordRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub instagram_username: Option<String>,
    pub instagram_id: i64,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub license: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub last_used_in_api: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LicenseRecordRow {
    pub fn license_kind(&self) -> Option<License> {
        License::parse(&self.license)
    }

    pub fn license_full_name(&self) -> Option<&'static str> {
        self.license_kind().map(|l| l.full_name())
    }

    pub fn license_url(&self) -> Option<&'static str> {
        self.license_kind().map(|l| l.url())
    }
}
