use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use selfupdate_utils::versioning::normalize_tag;

/// One published release as returned by the release feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl ReleaseInfo {
    /// Tag without its conventional `v` prefix.
    pub fn version(&self) -> &str {
        normalize_tag(&self.tag_name)
    }

    /// Release notes, empty when the feed has none.
    pub fn notes(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.tag_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub content_type: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}
