//! Configuration for the updater

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use selfupdate_provider::{GitHubReleaseClient, DEFAULT_CHUNK_SIZE, GITHUB_API_URL};
use selfupdate_utils::HttpClient;

use crate::error::{Result, UpdateError};
use crate::selector::AssetRules;

/// Updater configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Base URL of the release API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Repository owner on the release host
    #[serde(default)]
    pub owner: String,

    /// Repository name on the release host
    #[serde(default)]
    pub repo: String,

    /// Version of the running build
    #[serde(default = "default_current_version")]
    pub current_version: String,

    /// Directory the artifact is downloaded into
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// File name of the downloaded artifact
    #[serde(default = "default_artifact_name")]
    pub artifact_name: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for each request and for each stalled body read, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Bytes written per transfer step
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overrides the platform tag reported by the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_tag: Option<String>,

    /// API token, never written back out
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    #[serde(default)]
    pub asset_rules: AssetRules,
}

fn default_api_url() -> String {
    GITHUB_API_URL.to_string()
}

fn default_current_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_artifact_dir() -> PathBuf {
    std::env::temp_dir().join("selfupdate")
}

fn default_artifact_name() -> String {
    "update.apk".to_string()
}

fn default_user_agent() -> String {
    format!("selfupdate/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    60
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            owner: String::new(),
            repo: String::new(),
            current_version: default_current_version(),
            artifact_dir: default_artifact_dir(),
            artifact_name: default_artifact_name(),
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
            chunk_size: default_chunk_size(),
            platform_tag: None,
            token: None,
            asset_rules: AssetRules::default(),
        }
    }
}

impl UpdaterConfig {
    /// Create a configuration for `owner/repo` with default values
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            ..Self::default()
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn with_artifact_name(mut self, name: impl Into<String>) -> Self {
        self.artifact_name = name.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set timeout in seconds
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_platform_tag(mut self, tag: impl Into<String>) -> Self {
        self.platform_tag = Some(tag.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_asset_rules(mut self, rules: AssetRules) -> Self {
        self.asset_rules = rules;
        self
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - SELFUPDATE_API_URL: release API base (default: https://api.github.com)
    /// - SELFUPDATE_OWNER / SELFUPDATE_REPO: repository coordinates
    /// - SELFUPDATE_CURRENT_VERSION: version of the running build
    /// - SELFUPDATE_ARTIFACT_DIR / SELFUPDATE_ARTIFACT_NAME: download target
    /// - SELFUPDATE_TIMEOUT: seconds (default: 60)
    /// - SELFUPDATE_CHUNK_SIZE: bytes (default: 8192)
    /// - SELFUPDATE_PLATFORM_TAG: platform variant override
    /// - SELFUPDATE_TOKEN: API token
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(api_url) = std::env::var("SELFUPDATE_API_URL") {
            config.api_url = api_url;
        }
        if let Ok(owner) = std::env::var("SELFUPDATE_OWNER") {
            config.owner = owner;
        }
        if let Ok(repo) = std::env::var("SELFUPDATE_REPO") {
            config.repo = repo;
        }
        if let Ok(version) = std::env::var("SELFUPDATE_CURRENT_VERSION") {
            config.current_version = version;
        }
        if let Ok(dir) = std::env::var("SELFUPDATE_ARTIFACT_DIR") {
            config.artifact_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("SELFUPDATE_ARTIFACT_NAME") {
            config.artifact_name = name;
        }

        if let Ok(timeout) = std::env::var("SELFUPDATE_TIMEOUT") {
            match timeout.parse() {
                Ok(seconds) => config.timeout_seconds = seconds,
                Err(_) => tracing::warn!("ignoring SELFUPDATE_TIMEOUT={}", timeout),
            }
        }
        if let Ok(chunk_size) = std::env::var("SELFUPDATE_CHUNK_SIZE") {
            match chunk_size.parse() {
                Ok(bytes) => config.chunk_size = bytes,
                Err(_) => tracing::warn!("ignoring SELFUPDATE_CHUNK_SIZE={}", chunk_size),
            }
        }

        if let Ok(tag) = std::env::var("SELFUPDATE_PLATFORM_TAG") {
            config.platform_tag = Some(tag).filter(|t| !t.trim().is_empty());
        }
        if let Ok(token) = std::env::var("SELFUPDATE_TOKEN") {
            config.token = Some(token).filter(|t| !t.trim().is_empty());
        }

        config
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON string
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(UpdateError::Config("owner and repo are required".into()));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(UpdateError::Config(format!(
                "api_url must be an http(s) URL: {}",
                self.api_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(UpdateError::Config("timeout_seconds must be positive".into()));
        }
        if self.chunk_size == 0 {
            return Err(UpdateError::Config("chunk_size must be positive".into()));
        }
        if self.artifact_name.is_empty()
            || self.artifact_name.contains(['/', '\\'])
            || self.artifact_name == ".."
        {
            return Err(UpdateError::Config(format!(
                "artifact_name must be a plain file name: {:?}",
                self.artifact_name
            )));
        }
        if self.asset_rules.extension.is_empty() || self.asset_rules.debug_marker.is_empty() {
            return Err(UpdateError::Config(
                "asset rules need an extension and a debug marker".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Final location of the downloaded artifact
    pub fn artifact_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.artifact_name)
    }

    /// GitHub client configured from these settings.
    pub fn release_client(&self) -> Result<GitHubReleaseClient> {
        self.validate()?;
        let http = HttpClient::new(self.timeout())
            .map_err(|e| UpdateError::Config(format!("cannot build HTTP client: {}", e)))?
            .with_header("User-Agent", self.user_agent.clone());

        let mut client = GitHubReleaseClient::new(http, self.owner.clone(), self.repo.clone())
            .with_api_url(self.api_url.clone())
            .with_chunk_size(self.chunk_size);
        if let Some(token) = &self.token {
            client = client.with_token(token.clone());
        }
        Ok(client)
    }
}
